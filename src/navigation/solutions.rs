//! PPP Solutions
use std::collections::BTreeMap;

use crate::prelude::{Constellation, Epoch, Vector3, SV};

/// PPP Solution, always expressed as the correction to apply
/// to the nominal position, in the selected coordinates system.
#[derive(Debug, Clone, PartialEq)]
pub struct PPPSolution {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// Position correction [m]
    pub position: Vector3<f64>,
    /// Formal position sigma, per component [m]
    pub sigma: Vector3<f64>,
    /// Receiver clock offset [m]
    pub clock: f64,
    /// Zenith wet tropospheric delay, not captured by the model [m]
    pub wet_tropo: f64,
    /// Inter system biases [m]
    pub isb: BTreeMap<Constellation, f64>,
    /// Float phase ambiguities [m]
    pub ambiguities: BTreeMap<SV, f64>,
    /// Number of satellites that contributed
    pub satellites: usize,
    /// Solution has converged
    pub converged: bool,
}

impl PPPSolution {
    /// Formal 3D position sigma [m]
    pub fn sigma_3d(&self) -> f64 {
        self.sigma.norm()
    }
}

impl std::fmt::Display for PPPSolution {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:?} ({:.4E},{:.4E},{:.4E}) wet={:.4E} clk={:.4E} nsat={} converged={}",
            self.epoch,
            self.position[0],
            self.position[1],
            self.position[2],
            self.wet_tropo,
            self.clock,
            self.satellites,
            self.converged,
        )
    }
}
