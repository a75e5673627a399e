//! Convergence tracking
use log::info;
use std::collections::VecDeque;

use crate::prelude::{Epoch, Error};

/// [ConvergenceTracker] declares the solution converged once the last `window`
/// epochs all passed the (caller defined) quality criterion, and records
/// the time to first convergence (TTFC) of each convergence event.
#[derive(Debug, Clone)]
pub struct ConvergenceTracker {
    window: usize,
    buffer: VecDeque<bool>,
    converged: bool,
    /// Start of the current run (first epoch since creation or reset)
    start: Option<Epoch>,
    ttfc: Vec<f64>,
}

impl ConvergenceTracker {
    /// Builds a new [ConvergenceTracker] over this many epochs (at least one)
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            buffer: VecDeque::with_capacity(window),
            converged: false,
            start: None,
            ttfc: Vec::new(),
        }
    }
    /// Window size
    pub fn window(&self) -> usize {
        self.window
    }
    /// Latches the quality indicator of epoch `t`, returns the convergence status
    pub fn update(&mut self, t: Epoch, pass: bool) -> bool {
        let start = *self.start.get_or_insert(t);

        if self.buffer.len() == self.window {
            self.buffer.pop_front();
        }
        self.buffer.push_back(pass);

        let converged = self.buffer.len() == self.window && self.buffer.iter().all(|pass| *pass);

        if converged && !self.converged {
            let ttfc = (t - start).to_seconds();
            info!("{:?} - converged (ttfc={}s)", t, ttfc);
            self.ttfc.push(ttfc);
        }

        self.converged = converged;
        converged
    }
    /// Convergence status.
    /// Invalid until at least one epoch was presented since creation or last reset.
    pub fn converged(&self) -> Result<bool, Error> {
        if self.buffer.is_empty() {
            Err(Error::InvalidRequest("no epoch processed yet"))
        } else {
            Ok(self.converged)
        }
    }
    /// Time to first convergence [s] of every convergence event, in chronological order
    pub fn ttfc(&self) -> &[f64] {
        &self.ttfc
    }
    /// Clears the window and the convergence status. The next epoch
    /// starts a new run. TTFC history is preserved.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.converged = false;
        self.start = None;
    }
}
