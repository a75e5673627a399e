//! PPP solver
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use thiserror::Error;

use itertools::Itertools;
use nalgebra::{DMatrix, DVector, Vector3};

use crate::{
    cfg::Config,
    navigation::{
        filter::FilterState,
        state::{StateManager, Tracking},
        Axis, ConvergenceTracker, Input, PPPSolution, Unknown, Weights,
    },
    observation::EpochRecord,
    prelude::Epoch,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{what}: dimension mismatch (expected {expected}, got {found})")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("innovation covariance is not invertible")]
    SingularInnovation,
    #[error("failed to invert normal matrix")]
    MatrixInversion,
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
}

/// State reconciled ahead of [Solver::compute]
#[derive(Debug, Clone)]
struct Pending {
    t: Epoch,
    state: StateManager,
}

/// PPP Solver.
/// The solver stores the navigation state of one data stream:
/// never use the same [Solver] to process different data streams.
#[derive(Debug)]
pub struct Solver {
    /// Identifies this solver in the logs
    name: String,
    /// Solver configuration
    cfg: Config,
    /// Navigation state
    state: StateManager,
    /// Navigation filter
    filter: FilterState,
    /// Convergence tracking
    convergence: ConvergenceTracker,
    /// State prepared for next [Solver::compute]
    pending: Option<Pending>,
    /// Latest resolved epoch
    last_epoch: Option<Epoch>,
}

impl Solver {
    /// Builds new [Solver] using given [Config]uration.
    /// `name` identifies this solver (usually the station) in the logs.
    pub fn new(name: &str, cfg: Config) -> Self {
        for unknown in [
            Unknown::WetTropo,
            Unknown::Clock,
            Unknown::Coordinate(Axis::X),
            Unknown::Coordinate(Axis::Y),
            Unknown::Coordinate(Axis::Z),
        ] {
            debug!("{} - {} ({}): {}", name, unknown, cfg.frame, cfg.model(&unknown));
        }
        if !cfg.enabled(cfg.reference) {
            warn!(
                "{} - reference constellation {} is not enabled",
                name, cfg.reference
            );
        }
        Self {
            name: name.to_string(),
            filter: FilterState::init(cfg.filter),
            convergence: ConvergenceTracker::new(cfg.convergence.window),
            state: StateManager::new(),
            pending: None,
            last_epoch: None,
            cfg,
        }
    }
    /// Name of this [Solver]
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Configuration of this [Solver]
    pub fn cfg(&self) -> &Config {
        &self.cfg
    }
    fn check_chronology(&self, t: Epoch) -> Result<(), Error> {
        match self.last_epoch {
            Some(last) if t < last => {
                error!("{} {:?} - prior latest epoch {:?}", self.name, t, last);
                Err(Error::InvalidRequest("epochs must be chronological"))
            },
            _ => Ok(()),
        }
    }
    /// Registers the satellites tracked at `t` (with their cycle slip flags),
    /// ahead of [Solver::compute]. Returns the state layout the design matrix
    /// of that epoch must follow, column wise.
    /// Nothing is committed until [Solver::compute] succeeds.
    pub fn prepare(&mut self, t: Epoch, tracking: &[Tracking]) -> Result<Vec<Unknown>, Error> {
        self.check_chronology(t)?;
        let mut state = self.state.clone();
        let summary = state.reconcile(t, tracking, &self.cfg);
        debug!(
            "{} {:?} - {} unknowns (+{} -{} slips={} isb+{})",
            self.name,
            t,
            state.len(),
            summary.added.len(),
            summary.dropped.len(),
            summary.slipped.len(),
            summary.isb.len(),
        );
        let layout = state.layout();
        self.pending = Some(Pending { t, state });
        Ok(layout)
    }
    /// Resolves the equation system of epoch `t`.
    /// - prefit: prefit residuals
    /// - h: design matrix, rows ordered as the prefit residuals,
    ///   columns ordered as [Solver::layout] (as returned by [Solver::prepare])
    /// - weights: measurement [Weights]
    ///
    /// The state only advances on success: on any error, the [Solver]
    /// is left exactly as it was prior this call.
    pub fn compute(
        &mut self,
        t: Epoch,
        prefit: &DVector<f64>,
        h: &DMatrix<f64>,
        weights: Weights,
    ) -> Result<(), Error> {
        self.resolve(t, prefit, h, weights, None)
    }
    /// Same as [Solver::compute], but the prediction uses these state
    /// transition (`phi`) and process noise (`q`) diagonals, ordered as
    /// [Solver::layout], instead of the configured [StochasticModel](crate::prelude::StochasticModel)s.
    /// Ignored by the least squares [Filter](crate::prelude::Filter).
    pub fn compute_with_transitions(
        &mut self,
        t: Epoch,
        prefit: &DVector<f64>,
        h: &DMatrix<f64>,
        weights: Weights,
        phi: &DVector<f64>,
        q: &DVector<f64>,
    ) -> Result<(), Error> {
        self.resolve(t, prefit, h, weights, Some((phi.clone(), q.clone())))
    }
    fn resolve(
        &mut self,
        t: Epoch,
        prefit: &DVector<f64>,
        h: &DMatrix<f64>,
        weights: Weights,
        transitions: Option<(DVector<f64>, DVector<f64>)>,
    ) -> Result<(), Error> {
        self.check_chronology(t)?;

        let mut state = match self.pending.take() {
            Some(pending) if pending.t == t => pending.state,
            pending => {
                if let Some(pending) = pending {
                    warn!(
                        "{} {:?} - discarding state prepared for {:?}",
                        self.name, t, pending.t
                    );
                }
                let mut state = self.state.clone();
                if !state.initialized() {
                    state.initialize(&self.cfg);
                }
                state
            },
        };

        let input = Input {
            z: prefit.clone(),
            h: h.clone(),
            w: weights.expand(self.cfg.weight_factor),
        };

        if let Err(e) = input.validate(state.len()) {
            error!("{} {:?} - {}", self.name, t, e);
            return Err(e);
        }

        let dt_s = match self.last_epoch {
            Some(last) => (t - last).to_seconds(),
            None => 0.0,
        };

        let transitions = match transitions {
            Some((phi, q)) => {
                for (what, diagonal) in [("phi", &phi), ("q", &q)] {
                    if diagonal.len() != state.len() {
                        let e = Error::DimensionMismatch {
                            what,
                            expected: state.len(),
                            found: diagonal.len(),
                        };
                        error!("{} {:?} - {}", self.name, t, e);
                        return Err(e);
                    }
                }
                (phi, q)
            },
            None => state.transitions(dt_s, &self.cfg),
        };
        let mut filter = self.filter.clone();

        if let Err(e) = filter.run(&mut state.x, &mut state.p, transitions, &input) {
            warn!("{} {:?} - {}: epoch discarded", self.name, t, e);
            return Err(e);
        }

        self.state = state;
        self.filter = filter;
        self.last_epoch = Some(t);

        let pass = self
            .state
            .position_sigma()
            .map(|sigma| sigma < self.cfg.convergence.max_sigma_m)
            .unwrap_or(false);

        self.convergence.update(t, pass);
        Ok(())
    }
    /// Resolves this [EpochRecord] and writes the postfit residuals back into it.
    /// Satellites of disabled constellations are ignored.
    pub fn process(&mut self, record: &mut EpochRecord) -> Result<PPPSolution, Error> {
        let t = record.epoch;

        let disabled = record
            .satellites
            .iter()
            .filter(|obs| !self.cfg.enabled(obs.sv.constellation))
            .count();

        if disabled > 0 {
            warn!(
                "{} {:?} - {} satellite(s) of disabled constellations",
                self.name, t, disabled
            );
        }

        let retained = record
            .satellites
            .iter()
            .enumerate()
            .filter(|(_, obs)| self.cfg.enabled(obs.sv.constellation))
            .unique_by(|(_, obs)| obs.sv)
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        let nsat = retained.len();
        if nsat == 0 {
            return Err(Error::DimensionMismatch {
                what: "satellites",
                expected: 1,
                found: 0,
            });
        }

        let tracking = retained
            .iter()
            .map(|i| {
                let obs = &record.satellites[*i];
                Tracking {
                    sv: obs.sv,
                    slip: obs.slip,
                }
            })
            .collect::<Vec<_>>();

        let layout = self.prepare(t, &tracking)?;
        let column = |unknown: &Unknown| layout.iter().position(|u| u == unknown);

        let n = layout.len();
        let mut z = DVector::<f64>::zeros(2 * nsat);
        let mut h = DMatrix::<f64>::zeros(2 * nsat, n);
        let mut w = DVector::<f64>::zeros(nsat);

        for (row, index) in retained.iter().enumerate() {
            let obs = &record.satellites[*index];

            z[row] = obs.code_prefit_m;
            z[nsat + row] = obs.phase_prefit_m;
            w[row] = obs.weight.unwrap_or(1.0);

            let mut coefficients = vec![
                (Unknown::WetTropo, obs.wet_mapping),
                (Unknown::Clock, 1.0),
                (Unknown::Coordinate(Axis::X), obs.partials[0]),
                (Unknown::Coordinate(Axis::Y), obs.partials[1]),
                (Unknown::Coordinate(Axis::Z), obs.partials[2]),
            ];

            if obs.sv.constellation != self.cfg.reference {
                coefficients.push((Unknown::InterSystemBias(obs.sv.constellation), 1.0));
            }

            for (unknown, value) in coefficients {
                if let Some(j) = column(&unknown) {
                    h[(row, j)] = value;
                    h[(nsat + row, j)] = value;
                }
            }

            if let Some(j) = column(&Unknown::Ambiguity(obs.sv)) {
                h[(nsat + row, j)] = 1.0;
            }
        }

        self.compute(t, &z, &h, Weights::PerSatellite(w))?;

        let postfit = &z - &h * &self.state.x;
        for (row, index) in retained.iter().enumerate() {
            let obs = &mut record.satellites[*index];
            obs.postfit_code_m = Some(postfit[row]);
            obs.postfit_phase_m = Some(postfit[nsat + row]);
        }

        let solution = self.solution(t, nsat);
        debug!("{} - {}", self.name, solution);
        Ok(solution)
    }
    fn solution(&self, t: Epoch, satellites: usize) -> PPPSolution {
        let estimate = |unknown: Unknown| self.state.estimate(&unknown).unwrap_or(0.0);
        let sigma = |unknown: Unknown| self.state.variance(&unknown).unwrap_or(0.0).sqrt();

        let isb = self
            .state
            .layout()
            .iter()
            .filter_map(|unknown| match unknown {
                Unknown::InterSystemBias(c) => Some((*c, estimate(*unknown))),
                _ => None,
            })
            .collect::<BTreeMap<_, _>>();

        let ambiguities = self
            .state
            .satellites()
            .iter()
            .map(|sv| (*sv, estimate(Unknown::Ambiguity(*sv))))
            .collect::<BTreeMap<_, _>>();

        PPPSolution {
            epoch: t,
            position: Vector3::new(
                estimate(Unknown::Coordinate(Axis::X)),
                estimate(Unknown::Coordinate(Axis::Y)),
                estimate(Unknown::Coordinate(Axis::Z)),
            ),
            sigma: Vector3::new(
                sigma(Unknown::Coordinate(Axis::X)),
                sigma(Unknown::Coordinate(Axis::Y)),
                sigma(Unknown::Coordinate(Axis::Z)),
            ),
            clock: estimate(Unknown::Clock),
            wet_tropo: estimate(Unknown::WetTropo),
            isb,
            ambiguities,
            satellites,
            converged: self.convergence.converged().unwrap_or(false),
        }
    }
    /// Resets this [Solver] completely: next epoch restarts from the priors.
    /// The time to first convergence history is preserved.
    pub fn reset(&mut self) {
        info!("{} - reset", self.name);
        self.state = StateManager::new();
        self.filter = FilterState::init(self.cfg.filter);
        self.convergence.reset();
        self.pending = None;
        self.last_epoch = None;
    }
    /// Reinitializes the head of the navigation state (wet tropo, clock,
    /// coordinates, then already known inter system biases) with given estimate `x`
    /// and covariance `p`. All ambiguities are forgotten, satellites in sight at the
    /// next epoch are treated as new. Convergence tracking restarts.
    pub fn reinitialize(&mut self, x: &DVector<f64>, p: &DMatrix<f64>) -> Result<(), Error> {
        let mut state = self.state.clone();
        if !state.initialized() {
            state.initialize(&self.cfg);
        }
        state.reinitialize(x, p)?;
        info!("{} - head reinitialized", self.name);
        self.state = state;
        self.convergence.reset();
        self.pending = None;
        Ok(())
    }
    /// Convergence status. Invalid until one epoch was resolved
    /// since the [Solver] creation or last reset.
    pub fn converged(&self) -> Result<bool, Error> {
        self.convergence.converged()
    }
    /// Time to first convergence [s] of each convergence event
    pub fn ttfc(&self) -> &[f64] {
        self.convergence.ttfc()
    }
    /// Current estimate of this [Unknown]
    pub fn estimate(&self, unknown: Unknown) -> Option<f64> {
        self.state.estimate(&unknown)
    }
    /// Current variance of this [Unknown]
    pub fn variance(&self, unknown: Unknown) -> Option<f64> {
        self.state.variance(&unknown)
    }
    /// Current state vector, ordered as [Solver::layout]
    pub fn state(&self) -> &DVector<f64> {
        &self.state.x
    }
    /// Current covariance matrix, ordered as [Solver::layout]
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.state.p
    }
    /// Current ordered list of unknowns
    pub fn layout(&self) -> Vec<Unknown> {
        self.state.layout()
    }
    /// State transition diagonal of the latest prediction (Kalman filter only)
    pub fn phi(&self) -> Option<&DVector<f64>> {
        self.filter.transitions().map(|(phi, _)| phi)
    }
    /// Process noise diagonal of the latest prediction (Kalman filter only)
    pub fn q(&self) -> Option<&DVector<f64>> {
        self.filter.transitions().map(|(_, q)| q)
    }
}
