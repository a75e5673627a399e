use log::warn;

use crate::{
    navigation::{Axis, Unknown},
    prelude::{Constellation, StochasticModel},
    stochastic::{DEFAULT_AMBIGUITY_SIGMA_M, DEFAULT_CLOCK_SIGMA_M, DEFAULT_TROPO_Q_PRIME},
};

#[cfg(feature = "serde")]
use serde::Deserialize;

pub use crate::navigation::filter::Filter;

/// Coordinates system of the three coordinate unknowns.
/// Partial derivatives must be expressed in that same system.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum CoordinateFrame {
    /// dx, dy, dz [m] ECEF
    #[default]
    ECEF,
    /// dLat, dLon, dH [m] local level
    NEU,
}

impl std::fmt::Display for CoordinateFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::ECEF => write!(f, "ECEF"),
            Self::NEU => write!(f, "NEU"),
        }
    }
}

/// Inter system bias [StochasticModel]s, per constellation.
/// ISB are stable over short periods: [StochasticModel::Constant]
/// or [StochasticModel::RandomWalk] are the meaningful choices.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IsbModels {
    pub glonass: StochasticModel,
    pub galileo: StochasticModel,
    pub beidou: StochasticModel,
    /// Any other non reference constellation
    pub others: StochasticModel,
}

impl Default for IsbModels {
    fn default() -> Self {
        let model = StochasticModel::random_walk(DEFAULT_TROPO_Q_PRIME);
        Self {
            glonass: model,
            galileo: model,
            beidou: model,
            others: model,
        }
    }
}

impl IsbModels {
    /// Returns [StochasticModel] for the ISB of this [Constellation]
    pub fn model(&self, constellation: Constellation) -> StochasticModel {
        match constellation {
            Constellation::Glonass => self.glonass,
            Constellation::Galileo => self.galileo,
            Constellation::BeiDou => self.beidou,
            _ => self.others,
        }
    }
}

/// Initial variances of the fixed unknowns
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Priors {
    /// Wet tropospheric delay [m²]
    pub tropo_variance: f64,
    /// Receiver clock offset [m²]
    pub clock_variance: f64,
    /// Each coordinate component [m²]
    pub coordinates_variance: f64,
    /// Each inter system bias [m²]
    pub isb_variance: f64,
}

impl Default for Priors {
    fn default() -> Self {
        Self {
            tropo_variance: 0.25,
            clock_variance: 9.0E10,
            coordinates_variance: 1.0E4,
            isb_variance: 1.0E4,
        }
    }
}

/// Convergence criteria
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConvergenceOpts {
    /// Number of consecutive epochs that must pass
    pub window: usize,
    /// Formal 3D position sigma [m] below which an epoch passes
    pub max_sigma_m: f64,
}

impl Default for ConvergenceOpts {
    fn default() -> Self {
        Self {
            window: 100,
            max_sigma_m: 0.1,
        }
    }
}

/// Kinematic coordinates sigmas [m]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KinematicOpts {
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub sigma_z: f64,
}

impl Default for KinematicOpts {
    fn default() -> Self {
        Self {
            sigma_x: 100.0,
            sigma_y: 100.0,
            sigma_z: 100.0,
        }
    }
}

/// Solver configuration. Set it before a run, or between two runs,
/// never in the middle of an epoch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Coordinates system
    pub frame: CoordinateFrame,
    /// Navigation [Filter]
    pub filter: Filter,
    /// Reference constellation: carries no inter system bias
    pub reference: Constellation,
    /// Enabled constellations
    pub constellations: Vec<Constellation>,
    /// First coordinate component (dx or dLat) [StochasticModel]
    pub x_model: StochasticModel,
    /// Second coordinate component (dy or dLon) [StochasticModel]
    pub y_model: StochasticModel,
    /// Third coordinate component (dz or dH) [StochasticModel]
    pub z_model: StochasticModel,
    /// Wet troposphere [StochasticModel]
    pub tropo_model: StochasticModel,
    /// Receiver clock [StochasticModel]
    pub clock_model: StochasticModel,
    /// Inter system biases [StochasticModel]s
    pub isb: IsbModels,
    /// Phase ambiguity prior and reset sigma [m]
    pub ambiguity_sigma_m: f64,
    /// Initial variances
    pub priors: Priors,
    /// Code / phase variance ratio.
    /// Phase measurement variance is 1/(weight * weight_factor).
    pub weight_factor: f64,
    /// Convergence criteria
    pub convergence: ConvergenceOpts,
    /// Kinematic mode: replaces the coordinates models with
    /// [StochasticModel::WhiteNoise] of these sigmas.
    pub kinematic: Option<KinematicOpts>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame: CoordinateFrame::default(),
            filter: Filter::default(),
            reference: Constellation::GPS,
            constellations: vec![Constellation::GPS],
            x_model: StochasticModel::Constant,
            y_model: StochasticModel::Constant,
            z_model: StochasticModel::Constant,
            tropo_model: StochasticModel::random_walk(DEFAULT_TROPO_Q_PRIME),
            clock_model: StochasticModel::white_noise(DEFAULT_CLOCK_SIGMA_M),
            isb: IsbModels::default(),
            ambiguity_sigma_m: DEFAULT_AMBIGUITY_SIGMA_M,
            priors: Priors::default(),
            weight_factor: 10_000.0,
            convergence: ConvergenceOpts::default(),
            kinematic: None,
        }
    }
}

impl Config {
    /// Copies and returns [Config] using this [CoordinateFrame]
    pub fn with_frame(&self, frame: CoordinateFrame) -> Self {
        let mut s = self.clone();
        s.frame = frame;
        s
    }
    /// Copies and returns [Config] using this navigation [Filter]
    pub fn with_filter(&self, filter: Filter) -> Self {
        let mut s = self.clone();
        s.filter = filter;
        s
    }
    /// Copies and returns [Config] with these enabled constellations
    pub fn with_constellations(&self, constellations: &[Constellation]) -> Self {
        let mut s = self.clone();
        s.constellations = constellations.to_vec();
        s
    }
    /// Copies and returns [Config] with phase sigma = code sigma / `ratio`
    pub fn with_phase_sigma_ratio(&self, ratio: f64) -> Self {
        let mut s = self.clone();
        s.weight_factor = ratio * ratio;
        s
    }
    /// Copies and returns [Config] with this convergence window size
    pub fn with_convergence_window(&self, window: usize) -> Self {
        let mut s = self.clone();
        s.convergence.window = window;
        s
    }
    /// Copies and returns [Config] with the same [StochasticModel] on all coordinates.
    /// Prefer non state aware models here ([StochasticModel::Constant]
    /// or [StochasticModel::WhiteNoise]).
    pub fn with_coordinates_model(&self, model: StochasticModel) -> Self {
        if model.is_state_aware() {
            warn!("state aware model {} shared by all coordinates", model);
        }
        let mut s = self.clone();
        s.x_model = model;
        s.y_model = model;
        s.z_model = model;
        s
    }
    /// Copies and returns [Config] in kinematic mode, with these coordinates sigmas [m]
    pub fn kinematic(&self, sigma_x: f64, sigma_y: f64, sigma_z: f64) -> Self {
        let mut s = self.clone();
        s.kinematic = Some(KinematicOpts {
            sigma_x,
            sigma_y,
            sigma_z,
        });
        s
    }
    /// True if this [Constellation] is enabled
    pub fn enabled(&self, constellation: Constellation) -> bool {
        self.constellations.contains(&constellation)
    }
    /// Returns the [StochasticModel] of this [Unknown]
    pub fn model(&self, unknown: &Unknown) -> StochasticModel {
        match unknown {
            Unknown::WetTropo => self.tropo_model,
            Unknown::Clock => self.clock_model,
            Unknown::Coordinate(axis) => match (self.kinematic, axis) {
                (Some(k), Axis::X) => StochasticModel::white_noise(k.sigma_x),
                (Some(k), Axis::Y) => StochasticModel::white_noise(k.sigma_y),
                (Some(k), Axis::Z) => StochasticModel::white_noise(k.sigma_z),
                (None, Axis::X) => self.x_model,
                (None, Axis::Y) => self.y_model,
                (None, Axis::Z) => self.z_model,
            },
            Unknown::InterSystemBias(constellation) => self.isb.model(*constellation),
            Unknown::Ambiguity(_) => StochasticModel::phase_ambiguity(self.ambiguity_sigma_m),
        }
    }
    /// Returns initial variance of this [Unknown]
    pub fn prior_variance(&self, unknown: &Unknown) -> f64 {
        match unknown {
            Unknown::WetTropo => self.priors.tropo_variance,
            Unknown::Clock => self.priors.clock_variance,
            Unknown::Coordinate(_) => self.priors.coordinates_variance,
            Unknown::InterSystemBias(_) => self.priors.isb_variance,
            Unknown::Ambiguity(_) => self.ambiguity_sigma_m.powi(2),
        }
    }
}
