//! Core trait and type definitions for the AUGMECON engine.
//!
//! The central trait — [`ObjectiveSolver`] — defines the contract between
//! the generic grid-search engine and the external single-objective solver
//! that evaluates one grid point at a time.

use std::collections::BTreeMap;

use serde::Serialize;

/// Optimization direction of one objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectiveSense {
    /// Larger values are better.
    Maximize,
    /// Smaller values are better.
    Minimize,
}

/// Termination status of a single sub-problem solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    /// Proven optimal solution found.
    Optimal,
    /// No feasible solution exists.
    Infeasible,
    /// The solver could not separate infeasibility from unboundedness.
    InfeasibleOrUnbounded,
    /// Any other termination (unbounded, numerical failure, interrupted).
    Other,
}

impl SolveStatus {
    /// Whether the sub-problem was solved to optimality.
    #[inline]
    pub fn is_optimal(self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }

    /// Whether the sub-problem is infeasible.
    ///
    /// `InfeasibleOrUnbounded` counts as infeasible: during the grid
    /// traversal a tightened epsilon constraint is the only plausible cause.
    #[inline]
    pub fn is_infeasible(self) -> bool {
        matches!(
            self,
            SolveStatus::Infeasible | SolveStatus::InfeasibleOrUnbounded
        )
    }
}

/// External single-objective solve capability.
///
/// The engine drives the solver exclusively through this interface: it
/// activates one objective at a time, pins objectives during payoff-table
/// construction, installs the epsilon-constraint slack structure once, and
/// then repeatedly updates right-hand sides and re-solves.
///
/// Objective indices are 0-based. "Constrained index" `o` refers to
/// objective `o + 1` turned into a constraint; there are `n - 1` of them.
///
/// # Thread Safety
///
/// Implementations must be `Send`: after the payoff table and grid are
/// finalized, [`fork`](ObjectiveSolver::fork) produces one self-contained
/// copy per worker thread, and each copy is mutated only by its owner.
pub trait ObjectiveSolver: Send {
    /// Number of objectives in the model.
    fn objective_count(&self) -> usize;

    /// Current sense of objective `i`.
    fn objective_sense(&self, i: usize) -> ObjectiveSense;

    /// Negates the expression of objective `i` and flips its sense.
    ///
    /// Used to normalize every objective to maximization before the search;
    /// the engine undoes the sign flip on all reported values.
    fn negate_objective(&mut self, i: usize);

    /// Makes objective `i` the one optimized by the next solve.
    fn activate_objective(&mut self, i: usize);

    /// Removes objective `i` from the next solve.
    fn deactivate_objective(&mut self, i: usize);

    /// Adds an auxiliary equality constraint fixing objective `i`'s
    /// expression to `value`. Pins accumulate until cleared.
    fn pin_objective(&mut self, i: usize, value: f64);

    /// Removes all auxiliary equality constraints added by
    /// [`pin_objective`](ObjectiveSolver::pin_objective).
    fn clear_pinned_objectives(&mut self);

    /// Installs the epsilon-constraint structure.
    ///
    /// For each constrained index `o`, adds `expr(o + 1) - slack(o) == rhs(o)`
    /// with `slack(o) >= 0`, and augments objective 0 with the penalty term
    /// `eps * 10^(-o) * slack(o) / obj_range[o]`. Right-hand sides start
    /// unset and must be assigned via
    /// [`set_constraint_rhs`](ObjectiveSolver::set_constraint_rhs) before
    /// solving.
    fn install_slack_constraints(&mut self, eps: f64, obj_range: &[f64]);

    /// Sets the right-hand side of constrained index `o`.
    fn set_constraint_rhs(&mut self, o: usize, value: f64);

    /// Solves the currently configured sub-problem.
    fn solve(&mut self) -> SolveStatus;

    /// Value of objective `i` at the last optimal solve.
    ///
    /// For objective 0 this includes the slack penalty terms once they are
    /// installed; the engine subtracts them when recording a solution.
    fn objective_value(&self, i: usize) -> f64;

    /// Slack of constrained index `o` at the last optimal solve.
    fn slack_value(&self, o: usize) -> f64;

    /// Decision-variable snapshot of the last optimal solve.
    fn variable_values(&self) -> BTreeMap<String, f64>;

    /// A self-contained copy of the solver usable from another thread.
    fn fork(&self) -> Box<dyn ObjectiveSolver>;
}

/// One recorded grid-point solution: the objective tuple (canonical
/// direction until aggregation restores the original senses) and the
/// decision variables that achieved it.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    /// Objective values, primary first.
    pub objectives: Vec<f64>,
    /// Decision-variable values at this solution.
    pub variables: BTreeMap<String, f64>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Every grid point was visited.
    Complete,
    /// The wall-clock timeout drained the remaining work; the result is
    /// partial by design.
    TimedOut,
    /// At least one worker died; the result holds whatever was collected.
    WorkerLost,
}

/// Errors surfaced by the engine.
///
/// Sub-problem infeasibility during the traversal is NOT an error — it is a
/// normal outcome counted and pruned by the workers.
#[derive(Debug, thiserror::Error)]
pub enum AugmeconError {
    /// The configuration is invalid; raised before any solving begins.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A payoff-table support solve terminated without an optimum.
    #[error("payoff solve for objective {objective} ended with status {status:?}")]
    PayoffSolve {
        /// Objective whose solve failed.
        objective: usize,
        /// Termination status reported by the solver.
        status: SolveStatus,
    },

    /// A solution tuple was not found in the Pareto set.
    #[error("solution not found: {0:?}")]
    SolutionNotFound(Vec<f64>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(SolveStatus::Optimal.is_optimal());
        assert!(!SolveStatus::Optimal.is_infeasible());
        assert!(SolveStatus::Infeasible.is_infeasible());
        assert!(SolveStatus::InfeasibleOrUnbounded.is_infeasible());
        assert!(!SolveStatus::Other.is_optimal());
        assert!(!SolveStatus::Other.is_infeasible());
    }

    #[test]
    fn test_error_messages() {
        let err = AugmeconError::Config("grid_points must be at least 2".into());
        assert!(err.to_string().contains("grid_points"));

        let err = AugmeconError::PayoffSolve {
            objective: 1,
            status: SolveStatus::Infeasible,
        };
        assert!(err.to_string().contains("objective 1"));
    }
}
