#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod cfg;
mod navigation;
mod observation;
mod solver;
mod stochastic;

// pub export
pub use solver::Error;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::cfg::{
        Config, ConvergenceOpts, CoordinateFrame, Filter, IsbModels, KinematicOpts, Priors,
    };
    pub use crate::navigation::{
        state::Tracking, Axis, ConvergenceTracker, PPPSolution, Unknown, Weights,
    };
    pub use crate::observation::{EpochRecord, SatelliteObservation};
    pub use crate::solver::{Error, Solver};
    pub use crate::stochastic::StochasticModel;
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::{DMatrix, DVector, Vector3};
}
