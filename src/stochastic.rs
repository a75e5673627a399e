//! Stochastic models
#[cfg(feature = "serde")]
use serde::Deserialize;

/// Tropospheric wet delay default process spectral density [m²/s]
pub const DEFAULT_TROPO_Q_PRIME: f64 = 3.0E-8;

/// Receiver clock default white noise sigma [m]
pub const DEFAULT_CLOCK_SIGMA_M: f64 = 3.0E5;

/// Phase ambiguity default (prior and reset) sigma [m]
pub const DEFAULT_AMBIGUITY_SIGMA_M: f64 = 2.0E7;

/// [StochasticModel] describes how one unknown evolves between two epochs.
/// Each model resolves to a state transition coefficient (phi) and a process
/// noise variance (q), applied to that single unknown.
/// Models are plain values: the same model may be assigned to several unknowns,
/// each unknown still evolves independently.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum StochasticModel {
    /// Value and variance only evolve through measurement updates
    #[default]
    Constant,
    /// Previous value is discarded at every epoch, and replaced
    /// by a zero mean estimate with sigma² variance.
    /// Typically used for kinematic coordinates and receiver clock.
    WhiteNoise {
        /// Sigma [unit of the unknown]
        sigma: f64,
    },
    /// Variance grows linearly with elapsed time.
    /// Used for slowly varying quantities like the wet tropospheric delay.
    RandomWalk {
        /// Process spectral density [unit²/s]
        q_prime: f64,
    },
    /// Constant between cycle slips, white noise
    /// with sigma² variance on a cycle slip.
    PhaseAmbiguity {
        /// Reset sigma [m]
        sigma: f64,
    },
}

impl StochasticModel {
    /// Builds a [StochasticModel::WhiteNoise] with given sigma
    pub fn white_noise(sigma: f64) -> Self {
        Self::WhiteNoise { sigma }
    }
    /// Builds a [StochasticModel::RandomWalk] with given spectral density
    pub fn random_walk(q_prime: f64) -> Self {
        Self::RandomWalk { q_prime }
    }
    /// Builds a [StochasticModel::PhaseAmbiguity] with given reset sigma
    pub fn phase_ambiguity(sigma: f64) -> Self {
        Self::PhaseAmbiguity { sigma }
    }
    /// Returns (phi, q) for an elapsed time of `dt_s` seconds.
    /// `slip` is only meaningful to [StochasticModel::PhaseAmbiguity].
    pub fn propagate(&self, dt_s: f64, slip: bool) -> (f64, f64) {
        match self {
            Self::Constant => (1.0, 0.0),
            Self::WhiteNoise { sigma } => (0.0, sigma.powi(2)),
            Self::RandomWalk { q_prime } => (1.0, q_prime * dt_s),
            Self::PhaseAmbiguity { sigma } => {
                if slip {
                    (0.0, sigma.powi(2))
                } else {
                    (1.0, 0.0)
                }
            },
        }
    }
    /// True if this model keeps memory of the previous estimate
    pub fn is_state_aware(&self) -> bool {
        matches!(self, Self::RandomWalk { .. } | Self::PhaseAmbiguity { .. })
    }
}

impl std::fmt::Display for StochasticModel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Constant => write!(f, "constant"),
            Self::WhiteNoise { sigma } => write!(f, "white-noise(sigma={:.3E})", sigma),
            Self::RandomWalk { q_prime } => write!(f, "random-walk(q'={:.3E})", q_prime),
            Self::PhaseAmbiguity { sigma } => write!(f, "phase-ambiguity(sigma={:.3E})", sigma),
        }
    }
}
