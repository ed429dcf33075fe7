//! Shared progress counters.
//!
//! These atomics are the only coordination the workers need besides the
//! flag map and the queues. Relaxed ordering is enough: the counts feed
//! progress reporting and the final summary, not control flow.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe run counters.
#[derive(Debug, Default)]
pub struct ProgressCounters {
    /// Estimated total work: `gp^(n_obj - 1)` grid points plus `n_obj^2`
    /// payoff solves.
    total: AtomicUsize,

    /// Grid points fetched so far, whether solved or skipped, plus payoff
    /// solves.
    visited: AtomicUsize,

    /// Sub-problems actually handed to the solver.
    models_solved: AtomicUsize,

    /// Solves that came back infeasible.
    infeasibilities: AtomicUsize,
}

impl ProgressCounters {
    /// Fresh counters, all zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total-work estimate.
    pub fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }

    /// Records one fetched grid point (or payoff solve).
    #[inline]
    pub fn visit(&self) {
        self.visited.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one solver invocation.
    #[inline]
    pub fn solved(&self) {
        self.models_solved.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one infeasible outcome.
    #[inline]
    pub fn infeasible(&self) {
        self.infeasibilities.fetch_add(1, Ordering::Relaxed);
    }

    /// Total-work estimate.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Points fetched so far.
    pub fn visited(&self) -> usize {
        self.visited.load(Ordering::Relaxed)
    }

    /// Solver invocations so far.
    pub fn models_solved(&self) -> usize {
        self.models_solved.load(Ordering::Relaxed)
    }

    /// Infeasible outcomes so far.
    pub fn infeasibilities(&self) -> usize {
        self.infeasibilities.load(Ordering::Relaxed)
    }
}
