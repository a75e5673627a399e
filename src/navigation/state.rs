//! Dynamic navigation state
use log::debug;
use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use nalgebra::{DMatrix, DVector};

use crate::{
    cfg::Config,
    navigation::{Axis, Unknown},
    prelude::{Constellation, Epoch, Error, SV},
};

/// Number of unknowns always present: wet tropo, clock and 3 coordinates
pub(crate) const FIXED_UNKNOWNS: usize = 5;

/// Tracking status of one satellite, for one epoch.
/// Satellites that are not reported are considered out of sight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tracking {
    /// Satellite
    pub sv: SV,
    /// Cycle slip detected at this epoch
    pub slip: bool,
}

impl Tracking {
    /// Satellite tracked without cycle slip
    pub fn new(sv: SV) -> Self {
        Self { sv, slip: false }
    }
    /// Copies and returns [Tracking] with a cycle slip
    pub fn with_slip(&self) -> Self {
        let mut s = *self;
        s.slip = true;
        s
    }
}

/// Summary of one reconciliation
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Reconciliation {
    pub added: Vec<SV>,
    pub dropped: Vec<SV>,
    pub slipped: Vec<SV>,
    pub isb: Vec<Constellation>,
}

/// [StateManager] owns the state vector and its covariance.
/// The state is made of a head (fixed unknowns, then inter system biases
/// in order of appearance) followed by one ambiguity per tracked satellite.
/// `x.len() == p.nrows() == p.ncols() == head.len() + tail.len()` at all times.
#[derive(Debug, Clone)]
pub(crate) struct StateManager {
    /// Head unknowns, never reordered during a run
    head: Vec<Unknown>,
    /// Tracked satellites, in state order
    tail: Vec<SV>,
    /// Satellite to state index, rebuilt on every reconciliation
    table: HashMap<SV, usize>,
    /// State vector
    pub x: DVector<f64>,
    /// Covariance matrix
    pub p: DMatrix<f64>,
}

impl StateManager {
    /// Builds an empty (not initialized) [StateManager]
    pub fn new() -> Self {
        Self {
            head: Vec::with_capacity(FIXED_UNKNOWNS + 3),
            tail: Vec::with_capacity(32),
            table: HashMap::with_capacity(32),
            x: DVector::<f64>::zeros(0),
            p: DMatrix::<f64>::zeros(0, 0),
        }
    }
    /// True once head has been initialized
    pub fn initialized(&self) -> bool {
        !self.head.is_empty()
    }
    /// Initializes the head to configured priors, with empty tail
    pub fn initialize(&mut self, cfg: &Config) {
        self.head = vec![
            Unknown::WetTropo,
            Unknown::Clock,
            Unknown::Coordinate(Axis::X),
            Unknown::Coordinate(Axis::Y),
            Unknown::Coordinate(Axis::Z),
        ];
        self.tail.clear();
        self.table.clear();
        self.x = DVector::<f64>::zeros(FIXED_UNKNOWNS);
        self.p = DMatrix::<f64>::from_diagonal(&DVector::from_iterator(
            FIXED_UNKNOWNS,
            self.head.iter().map(|u| cfg.prior_variance(u)),
        ));
    }
    /// Total number of unknowns
    pub fn len(&self) -> usize {
        self.x.len()
    }
    /// Ordered list of unknowns
    pub fn layout(&self) -> Vec<Unknown> {
        self.head
            .iter()
            .copied()
            .chain(self.tail.iter().map(|sv| Unknown::Ambiguity(*sv)))
            .collect()
    }
    /// Returns index of this [Unknown] in the state vector
    pub fn index_of(&self, unknown: &Unknown) -> Option<usize> {
        match unknown {
            Unknown::Ambiguity(sv) => self.table.get(sv).copied(),
            unknown => self.head.iter().position(|u| u == unknown),
        }
    }
    /// Tracked satellites, in state order
    pub fn satellites(&self) -> &[SV] {
        &self.tail
    }
    fn rebuild_table(&mut self) {
        let offset = self.head.len();
        self.table = self
            .tail
            .iter()
            .enumerate()
            .map(|(i, sv)| (*sv, offset + i))
            .collect();
    }
    /// Inserts a new uncorrelated unknown at given index
    fn insert(&mut self, index: usize, value: f64, variance: f64) {
        let x = std::mem::replace(&mut self.x, DVector::zeros(0));
        let p = std::mem::replace(&mut self.p, DMatrix::zeros(0, 0));
        self.x = x.insert_row(index, value);
        self.p = p.insert_row(index, 0.0).insert_column(index, 0.0);
        self.p[(index, index)] = variance;
    }
    /// Forgets everything known about given unknown and
    /// restarts it uncorrelated, with this variance.
    fn restart(&mut self, index: usize, variance: f64) {
        self.x[index] = 0.0;
        self.p.row_mut(index).fill(0.0);
        self.p.column_mut(index).fill(0.0);
        self.p[(index, index)] = variance;
    }
    /// Reconciles the state with the satellites tracked at this epoch:
    /// - new inter system biases are inserted at the end of the head
    /// - satellites no longer in sight are dropped
    /// - new satellites are appended with prior variance
    /// - slipped satellites have their ambiguity restarted
    pub fn reconcile(
        &mut self,
        t: Epoch,
        tracking: &[Tracking],
        cfg: &Config,
    ) -> Reconciliation {
        if !self.initialized() {
            self.initialize(cfg);
        }

        let mut summary = Reconciliation::default();

        // a satellite reported twice slipped if any report says so
        let mut sightings = BTreeMap::<SV, bool>::new();
        for trk in tracking {
            *sightings.entry(trk.sv).or_insert(false) |= trk.slip;
        }

        for constellation in sightings
            .keys()
            .map(|sv| sv.constellation)
            .unique()
            .filter(|c| *c != cfg.reference)
        {
            let unknown = Unknown::InterSystemBias(constellation);
            if !self.head.contains(&unknown) {
                let index = self.head.len();
                self.insert(index, 0.0, cfg.prior_variance(&unknown));
                self.head.push(unknown);
                debug!("{:?} - new {} inter system bias", t, constellation);
                summary.isb.push(constellation);
            }
        }

        let head_len = self.head.len();
        let mut keep = (0..head_len).collect::<Vec<_>>();
        let mut tail = Vec::with_capacity(sightings.len());

        for (i, sv) in self.tail.iter().enumerate() {
            if sightings.contains_key(sv) {
                keep.push(head_len + i);
                tail.push(*sv);
            } else {
                debug!("{:?} ({}) - out of sight: ambiguity dropped", t, sv);
                summary.dropped.push(*sv);
            }
        }

        if !summary.dropped.is_empty() {
            self.x = self.x.select_rows(keep.iter());
            self.p = self.p.select_rows(keep.iter()).select_columns(keep.iter());
        }

        let kept = tail.len();
        for sv in sightings.keys() {
            if !tail.contains(sv) {
                debug!("{:?} ({}) - new ambiguity", t, sv);
                tail.push(*sv);
                summary.added.push(*sv);
            }
        }

        if !summary.added.is_empty() {
            let n = head_len + tail.len();
            let x = std::mem::replace(&mut self.x, DVector::zeros(0));
            let p = std::mem::replace(&mut self.p, DMatrix::zeros(0, 0));
            self.x = x.resize_vertically(n, 0.0);
            self.p = p.resize(n, n, 0.0);
            for (i, sv) in tail.iter().enumerate().skip(kept) {
                let index = head_len + i;
                self.p[(index, index)] = cfg.prior_variance(&Unknown::Ambiguity(*sv));
            }
        }

        self.tail = tail;
        self.rebuild_table();

        for (sv, slip) in sightings.iter() {
            if *slip && !summary.added.contains(sv) {
                if let Some(index) = self.table.get(sv).copied() {
                    let (_, q) = cfg.model(&Unknown::Ambiguity(*sv)).propagate(0.0, true);
                    self.restart(index, q);
                    debug!("{:?} ({}) - cycle slip: ambiguity reset", t, sv);
                    summary.slipped.push(*sv);
                }
            }
        }

        summary
    }
    /// Returns (phi, q) diagonals for elapsed time `dt_s`
    pub fn transitions(&self, dt_s: f64, cfg: &Config) -> (DVector<f64>, DVector<f64>) {
        let n = self.len();
        let mut phi = DVector::<f64>::zeros(n);
        let mut q = DVector::<f64>::zeros(n);
        for (i, unknown) in self.layout().iter().enumerate() {
            let (phi_i, q_i) = cfg.model(unknown).propagate(dt_s, false);
            phi[i] = phi_i;
            q[i] = q_i;
        }
        (phi, q)
    }
    /// Replaces the head block and clears the ambiguity tail
    pub fn reinitialize(&mut self, x: &DVector<f64>, p: &DMatrix<f64>) -> Result<(), Error> {
        let n = self.head.len();
        if x.len() != n {
            return Err(Error::DimensionMismatch {
                what: "state",
                expected: n,
                found: x.len(),
            });
        }
        if p.nrows() != n || p.ncols() != n {
            return Err(Error::DimensionMismatch {
                what: "covariance",
                expected: n,
                found: if p.nrows() != n { p.nrows() } else { p.ncols() },
            });
        }
        self.x = x.clone();
        self.p = p.clone();
        self.tail.clear();
        self.table.clear();
        Ok(())
    }
    /// Estimate of this [Unknown]
    pub fn estimate(&self, unknown: &Unknown) -> Option<f64> {
        self.index_of(unknown).map(|i| self.x[i])
    }
    /// Variance of this [Unknown]
    pub fn variance(&self, unknown: &Unknown) -> Option<f64> {
        self.index_of(unknown).map(|i| self.p[(i, i)])
    }
    /// Formal 3D position sigma [m]
    pub fn position_sigma(&self) -> Option<f64> {
        let mut var = 0.0;
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            var += self.variance(&Unknown::Coordinate(axis))?;
        }
        Some(var.sqrt())
    }
}
