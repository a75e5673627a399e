use crate::prelude::{Epoch, Vector3, SV};

/// Linearized code and phase measurements of one satellite,
/// as prepared by the signal modeling stages.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteObservation {
    /// Satellite
    pub(crate) sv: SV,
    /// Code prefit residual [m]
    pub(crate) code_prefit_m: f64,
    /// Phase prefit residual [m]
    pub(crate) phase_prefit_m: f64,
    /// Partial derivatives with respect to the three coordinates,
    /// in the selected coordinates system
    pub(crate) partials: Vector3<f64>,
    /// Wet tropospheric mapping function
    pub(crate) wet_mapping: f64,
    /// Code weight, phase weight is scaled by the weight factor.
    /// Defaults to 1.0
    pub(crate) weight: Option<f64>,
    /// Cycle slip detected on this satellite at this epoch
    pub(crate) slip: bool,
    /// Code postfit residual [m]
    pub(crate) postfit_code_m: Option<f64>,
    /// Phase postfit residual [m]
    pub(crate) postfit_phase_m: Option<f64>,
}

impl SatelliteObservation {
    /// Builds new [SatelliteObservation] from prefit residuals [m],
    /// coordinates partial derivatives and wet tropospheric mapping.
    pub fn new(
        sv: SV,
        code_prefit_m: f64,
        phase_prefit_m: f64,
        partials: Vector3<f64>,
        wet_mapping: f64,
    ) -> Self {
        Self {
            sv,
            code_prefit_m,
            phase_prefit_m,
            partials,
            wet_mapping,
            weight: None,
            slip: false,
            postfit_code_m: None,
            postfit_phase_m: None,
        }
    }
    /// Copies and returns [SatelliteObservation] with given weight
    pub fn with_weight(&self, weight: f64) -> Self {
        let mut s = self.clone();
        s.weight = Some(weight);
        s
    }
    /// Copies and returns [SatelliteObservation] marked as cycle slipped
    pub fn with_cycle_slip(&self) -> Self {
        let mut s = self.clone();
        s.slip = true;
        s
    }
    /// Satellite
    pub fn sv(&self) -> SV {
        self.sv
    }
    /// Code postfit residual [m], once resolved
    pub fn postfit_code_m(&self) -> Option<f64> {
        self.postfit_code_m
    }
    /// Phase postfit residual [m], once resolved
    pub fn postfit_phase_m(&self) -> Option<f64> {
        self.postfit_phase_m
    }
}

/// All satellite measurements of one epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochRecord {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// Satellites in sight that passed the validity checks
    pub satellites: Vec<SatelliteObservation>,
}

impl EpochRecord {
    /// Builds new empty [EpochRecord]
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            satellites: Vec::with_capacity(16),
        }
    }
    /// Copies and returns [EpochRecord] with one more [SatelliteObservation]
    pub fn with_satellite(&self, observation: SatelliteObservation) -> Self {
        let mut s = self.clone();
        s.satellites.push(observation);
        s
    }
    /// Returns [SatelliteObservation] of this [SV]
    pub fn satellite(&self, sv: SV) -> Option<&SatelliteObservation> {
        self.satellites.iter().find(|obs| obs.sv == sv)
    }
}
