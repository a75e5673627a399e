pub(crate) mod convergence;
pub(crate) mod filter;
pub(crate) mod lsq;
pub(crate) mod solutions;
pub(crate) mod state;

use nalgebra::{DMatrix, DVector};

use crate::prelude::{Constellation, Error, SV};

pub use convergence::ConvergenceTracker;
pub use solutions::PPPSolution;

/// Coordinate component. Meaning depends on the selected
/// [CoordinateFrame](crate::prelude::CoordinateFrame):
/// (dx, dy, dz) in ECEF, (dLat, dLon, dH) in NEU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// One scalar unknown of the navigation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Unknown {
    /// Zenith wet tropospheric delay [m]
    WetTropo,
    /// Receiver clock offset [m]
    Clock,
    /// Coordinate correction [m]
    Coordinate(Axis),
    /// Inter system bias of this (non reference) [Constellation] [m]
    InterSystemBias(Constellation),
    /// Carrier phase ambiguity of this [SV] [m]
    Ambiguity(SV),
}

impl std::fmt::Display for Unknown {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::WetTropo => write!(f, "wet-tropo"),
            Self::Clock => write!(f, "clock"),
            Self::Coordinate(axis) => write!(f, "{:?}", axis),
            Self::InterSystemBias(c) => write!(f, "isb({})", c),
            Self::Ambiguity(sv) => write!(f, "amb({})", sv),
        }
    }
}

/// Measurement weights
#[derive(Debug, Clone, PartialEq)]
pub enum Weights {
    /// Full (symmetric) weight matrix, one row per measurement
    Matrix(DMatrix<f64>),
    /// Diagonal weights, one per measurement.
    /// Equivalent to a diagonal [Weights::Matrix], but cheaper.
    Vector(DVector<f64>),
    /// One weight per satellite, for equation systems made of
    /// all code rows followed by all phase rows (same satellite order).
    /// Phase rows are scaled by the weight factor.
    PerSatellite(DVector<f64>),
}

impl Weights {
    /// Number of measurements these weights describe
    pub(crate) fn measurements(&self) -> usize {
        match self {
            Self::Matrix(w) => w.nrows(),
            Self::Vector(w) => w.len(),
            Self::PerSatellite(w) => 2 * w.len(),
        }
    }
    /// Converts [Weights::PerSatellite] to per measurement weights.
    /// Other forms are returned as is.
    pub(crate) fn expand(self, weight_factor: f64) -> Self {
        match self {
            Self::PerSatellite(w) => {
                let n = w.len();
                let mut expanded = DVector::<f64>::zeros(2 * n);
                for i in 0..n {
                    expanded[i] = w[i];
                    expanded[n + i] = w[i] * weight_factor;
                }
                Self::Vector(expanded)
            },
            other => other,
        }
    }
}

/// Equation system of one epoch
#[derive(Debug, Clone)]
pub(crate) struct Input {
    /// Prefit residuals
    pub z: DVector<f64>,
    /// Design matrix
    pub h: DMatrix<f64>,
    /// Measurement weights
    pub w: Weights,
}

impl Input {
    /// Verifies the dimensions of this system, for a state of `n` unknowns
    pub fn validate(&self, n: usize) -> Result<(), Error> {
        if self.h.ncols() != n {
            return Err(Error::DimensionMismatch {
                what: "design matrix columns",
                expected: n,
                found: self.h.ncols(),
            });
        }
        let m = self.z.len();
        if self.h.nrows() != m {
            return Err(Error::DimensionMismatch {
                what: "design matrix rows",
                expected: m,
                found: self.h.nrows(),
            });
        }
        if let Weights::Matrix(w) = &self.w {
            if w.nrows() != w.ncols() {
                return Err(Error::DimensionMismatch {
                    what: "weight matrix columns",
                    expected: w.nrows(),
                    found: w.ncols(),
                });
            }
        }
        if self.w.measurements() != m {
            return Err(Error::DimensionMismatch {
                what: "weights",
                expected: m,
                found: self.w.measurements(),
            });
        }
        if m == 0 {
            return Err(Error::DimensionMismatch {
                what: "measurements",
                expected: 1,
                found: 0,
            });
        }
        Ok(())
    }
}
