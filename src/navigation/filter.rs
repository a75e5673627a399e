use log::debug;
use nalgebra::{DMatrix, DVector};

#[cfg(feature = "serde")]
use serde::Deserialize;

use super::{lsq::LSQState, Input, Weights};
use crate::prelude::Error;

/// Navigation Filter.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum Filter {
    /// LSQ Filter: each epoch is solved on its own, without
    /// any prior knowledge. Requires an overdetermined system.
    LSQ,
    #[default]
    /// Kalman Filter. Heavier, but each unknown follows its own
    /// stochastic model and the filter converges over time.
    Kalman,
}

/// Kalman filter recursion over an externally owned (x, P)
#[derive(Debug, Clone, Default)]
pub(crate) struct KFState {
    /// number of updates
    pub nth: u64,
    /// last state transition (diagonal)
    pub phi: DVector<f64>,
    /// last process noise (diagonal)
    pub q: DVector<f64>,
}

impl KFState {
    pub fn init() -> Self {
        Self {
            nth: 0,
            phi: DVector::<f64>::zeros(0),
            q: DVector::<f64>::zeros(0),
        }
    }
    /// x' = Φx, P' = ΦPΦᵀ + Q, with diagonal Φ and Q
    pub fn predict(
        &mut self,
        x: &mut DVector<f64>,
        p: &mut DMatrix<f64>,
        phi: DVector<f64>,
        q: DVector<f64>,
    ) {
        let n = x.len();
        for i in 0..n {
            x[i] *= phi[i];
            for j in 0..n {
                p[(i, j)] *= phi[i] * phi[j];
            }
            p[(i, i)] += q[i];
        }
        self.phi = phi;
        self.q = q;
    }
    /// Measurement update. (x, P) are only modified on success.
    /// Solved in information form, P = (HᵀWH + P'⁻¹)⁻¹ and x = P(P'⁻¹x' + HᵀWz),
    /// or in gain form K = P'Hᵀ(HP'Hᵀ + R)⁻¹ when P' is not invertible.
    pub fn update(
        &mut self,
        x: &mut DVector<f64>,
        p: &mut DMatrix<f64>,
        input: &Input,
    ) -> Result<(), Error> {
        let ht = input.h.transpose();

        // HᵀW, and R = W⁻¹ when a full matrix is provided
        let (h_w, r) = match &input.w {
            Weights::Vector(w) => {
                let mut h_w = ht.clone();
                for (j, w_j) in w.iter().enumerate() {
                    if *w_j <= 0.0 || !w_j.is_finite() {
                        return Err(Error::SingularInnovation);
                    }
                    h_w.column_mut(j).scale_mut(*w_j);
                }
                (h_w, None)
            },
            Weights::Matrix(w) => {
                let r = w.clone().try_inverse().ok_or(Error::SingularInnovation)?;
                (&ht * w, Some(r))
            },
            Weights::PerSatellite(_) => {
                return Err(Error::InvalidRequest("per satellite weights must be expanded"));
            },
        };

        let (x_n, p_n) = match p.clone().try_inverse() {
            Some(p_inv) => {
                let p_n = (&h_w * &input.h + &p_inv)
                    .try_inverse()
                    .ok_or(Error::SingularInnovation)?;
                let x_n = &p_n * (&p_inv * &*x + &h_w * &input.z);
                (x_n, p_n)
            },
            None => {
                debug!("kalman update: singular prediction, using gain form");
                let r = match (r, &input.w) {
                    (Some(r), _) => r,
                    (None, Weights::Vector(w)) => DMatrix::from_diagonal(&w.map(|w_j| 1.0 / w_j)),
                    (None, _) => return Err(Error::SingularInnovation),
                };
                let p_ht = &*p * &ht;
                let s = &input.h * &p_ht + r;
                let s_inv = s.try_inverse().ok_or(Error::SingularInnovation)?;
                let k = p_ht * s_inv;
                let innovation = &input.z - &input.h * &*x;
                let x_n = &*x + &k * innovation;
                let n = x.len();
                let p_n = (DMatrix::<f64>::identity(n, n) - &k * &input.h) * &*p;
                (x_n, p_n)
            },
        };

        let p_n = (&p_n + p_n.transpose()) * 0.5;

        if x_n.iter().chain(p_n.iter()).any(|v| !v.is_finite()) {
            return Err(Error::SingularInnovation);
        }

        *x = x_n;
        *p = p_n;
        self.nth += 1;
        debug!(
            "kalman update #{} ({} measurements, {} unknowns)",
            self.nth,
            input.z.len(),
            x.len()
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum FilterState {
    Kf(KFState),
    Lsq(LSQState),
}

impl FilterState {
    pub fn init(filter: Filter) -> Self {
        match filter {
            Filter::Kalman => Self::Kf(KFState::init()),
            Filter::LSQ => Self::Lsq(LSQState::init()),
        }
    }
    /// Runs one epoch over (x, P): prediction (when meaningful) then update.
    /// (x, P) are only modified on success.
    pub fn run(
        &mut self,
        x: &mut DVector<f64>,
        p: &mut DMatrix<f64>,
        transitions: (DVector<f64>, DVector<f64>),
        input: &Input,
    ) -> Result<(), Error> {
        match self {
            Self::Kf(kf) => {
                let (mut x_bn, mut p_bn) = (x.clone(), p.clone());
                kf.predict(&mut x_bn, &mut p_bn, transitions.0, transitions.1);
                kf.update(&mut x_bn, &mut p_bn, input)?;
                *x = x_bn;
                *p = p_bn;
                Ok(())
            },
            Self::Lsq(lsq) => {
                let (x_n, p_n) = lsq.resolve(input)?;
                *x = x_n;
                *p = p_n;
                Ok(())
            },
        }
    }
    /// Last (Φ, Q) diagonals, when filtering
    pub fn transitions(&self) -> Option<(&DVector<f64>, &DVector<f64>)> {
        match self {
            Self::Kf(kf) if !kf.phi.is_empty() => Some((&kf.phi, &kf.q)),
            _ => None,
        }
    }
}
