//! The per-worker search loop.
//!
//! Each worker walks its assigned grid rows in traversal order. For every
//! coordinate it consults the flag map, skips while a jump is pending,
//! otherwise sets the constraint levels and solves. Infeasible outcomes
//! flag the rest of the row (early exit); optimal outcomes may flag the
//! levels their slack already dominates (bypass coefficient). Optimal
//! solutions are recorded with the slack penalty removed.

use std::sync::Arc;

use tracing::debug;

use crate::flag::Flag;
use crate::grid::GridCoord;
use crate::model::GridLevels;
use crate::progress::ProgressCounters;
use crate::queue::WorkQueues;
use crate::types::{Candidate, ObjectiveSolver};

/// Traversal toggles the worker needs, copied out of the run config.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Skip the rest of a row after an infeasible point.
    pub early_exit: bool,
    /// Skip levels dominated by the current optimum's slack.
    pub bypass_coefficient: bool,
    /// Augmented-objective penalty weight.
    pub penalty_weight: f64,
}

/// One grid-search worker. Owns a forked solver; shares the queues, flag
/// map, and counters with its peers.
pub struct SolverWorker {
    id: usize,
    opts: WorkerOptions,
    solver: Box<dyn ObjectiveSolver>,
    grid: Arc<GridLevels>,
    queues: Arc<WorkQueues>,
    flag: Arc<Flag>,
    counters: Arc<ProgressCounters>,
}

impl SolverWorker {
    pub fn new(
        id: usize,
        opts: WorkerOptions,
        solver: Box<dyn ObjectiveSolver>,
        grid: Arc<GridLevels>,
        queues: Arc<WorkQueues>,
        flag: Arc<Flag>,
        counters: Arc<ProgressCounters>,
    ) -> Self {
        Self {
            id,
            opts,
            solver,
            grid,
            queues,
            flag,
            counters,
        }
    }

    /// Runs until no work remains, returning every candidate found.
    pub fn run(mut self) -> Vec<Candidate> {
        let gp = self.grid.grid_points;
        let n_con = self.grid.levels.len();
        // Boundary index opposite the traversal start; bounds every jump so
        // a skip never overshoots its row.
        let cp_end = gp - 1;

        let mut jump = 0usize;
        let mut found = Vec::new();

        while let Some(row) = self.queues.get_work(self.id) {
            for c in row {
                self.counters.visit();

                let flagged = self.flag.get(&c);
                if flagged != 0 && jump == 0 {
                    jump = bounded_jump(cp_end, c[0] as isize - 1, flagged);
                }
                if jump > 0 {
                    jump -= 1;
                    continue;
                }

                for o in 0..n_con {
                    self.solver
                        .set_constraint_rhs(o, self.grid.levels[o][c[o]]);
                }
                self.solver.activate_objective(0);
                let status = self.solver.solve();
                self.counters.solved();

                if self.opts.early_exit && status.is_infeasible() {
                    self.counters.infeasible();
                    if self.flag.is_enabled() {
                        self.flag.set(&early_exit_ranges(&c, cp_end), gp);
                    }
                    jump = bounded_jump(cp_end, c[0] as isize, gp);
                    debug!(worker = self.id, coord = ?c, "infeasible");
                    continue;
                } else if self.opts.bypass_coefficient && status.is_optimal() {
                    let b = self.bypass_coefficients(n_con, gp);
                    if self.flag.is_enabled() {
                        self.flag.set(&bypass_ranges(&c, &b), b[0] + 1);
                    }
                    jump = bounded_jump(cp_end, c[0] as isize, b[0]);
                    debug!(worker = self.id, coord = ?c, jump = b[0], "bypass");
                }

                if status.is_optimal() {
                    found.push(self.record(n_con));
                }
            }
        }

        debug!(worker = self.id, candidates = found.len(), "worker done");
        found
    }

    /// Grid levels already dominated by the current optimum, one count per
    /// constrained index: `trunc(slack / step)`.
    fn bypass_coefficients(&self, n_con: usize, gp: usize) -> Vec<usize> {
        (0..n_con)
            .map(|i| {
                let step = self.grid.range[i] / (gp - 1) as f64;
                if step <= 0.0 {
                    return 0;
                }
                let slack = self.solver.slack_value(i).round();
                (slack / step) as usize
            })
            .collect()
    }

    /// Builds the candidate for an optimal solve: the primary value with
    /// the weighted slack penalty removed, then the constrained objective
    /// values, all in the normalized direction.
    fn record(&self, n_con: usize) -> Candidate {
        let penalty: f64 = (0..n_con)
            .map(|o| {
                if self.grid.range[o] <= 0.0 {
                    return 0.0;
                }
                10f64.powi(-(o as i32)) * self.solver.slack_value(o) / self.grid.range[o]
            })
            .sum();

        let mut objectives = Vec::with_capacity(n_con + 1);
        objectives.push(self.solver.objective_value(0) - self.opts.penalty_weight * penalty);
        for o in 0..n_con {
            objectives.push(self.solver.objective_value(o + 1));
        }

        Candidate {
            objectives,
            variables: self.solver.variable_values(),
        }
    }
}

/// `min(distance-to-row-boundary, requested)`: a jump starting after
/// position `from` may not overshoot the boundary at `cp_end`.
fn bounded_jump(cp_end: usize, from: isize, requested: usize) -> usize {
    let distance = (cp_end as isize - from).unsigned_abs();
    requested.min(distance)
}

/// Flag coverage after an infeasible point: the current axis-0 position,
/// crossed with the remaining levels (up to, not including, the boundary)
/// of every other axis.
fn early_exit_ranges(c: &GridCoord, cp_end: usize) -> Vec<std::ops::Range<usize>> {
    c.iter()
        .enumerate()
        .map(|(i, &ci)| if i == 0 { ci..ci + 1 } else { ci..cp_end })
        .collect()
}

/// Flag coverage after a bypass-eligible optimum: the current axis-0
/// position, crossed with the dominated level span of every other axis.
fn bypass_ranges(c: &GridCoord, b: &[usize]) -> Vec<std::ops::Range<usize>> {
    c.iter()
        .enumerate()
        .map(|(i, &ci)| {
            if i == 0 {
                ci..ci + 1
            } else {
                ci..ci + b[i] + 1
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::enumerate_grid;
    use crate::types::{ObjectiveSense, SolveStatus};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Solver stub with a scripted feasibility threshold per constrained
    /// index and a constant slack profile.
    ///
    /// Objective 0's value decreases linearly in the constraint levels, so
    /// the traversal produces a clean trade-off front.
    #[derive(Clone)]
    struct StubSolver {
        rhs: Vec<f64>,
        /// A level above this threshold makes the point infeasible.
        infeasible_above: Vec<f64>,
        /// Constant slack reported for every constrained index.
        slack: f64,
        solves: Arc<AtomicUsize>,
    }

    impl StubSolver {
        fn new(infeasible_above: Vec<f64>, slack: f64) -> Self {
            Self {
                rhs: vec![0.0; infeasible_above.len()],
                infeasible_above,
                slack,
                solves: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ObjectiveSolver for StubSolver {
        fn objective_count(&self) -> usize {
            self.rhs.len() + 1
        }

        fn objective_sense(&self, _i: usize) -> ObjectiveSense {
            ObjectiveSense::Maximize
        }

        fn negate_objective(&mut self, _i: usize) {}
        fn activate_objective(&mut self, _i: usize) {}
        fn deactivate_objective(&mut self, _i: usize) {}
        fn pin_objective(&mut self, _i: usize, _value: f64) {}
        fn clear_pinned_objectives(&mut self) {}
        fn install_slack_constraints(&mut self, _eps: f64, _obj_range: &[f64]) {}

        fn set_constraint_rhs(&mut self, o: usize, value: f64) {
            self.rhs[o] = value;
        }

        fn solve(&mut self) -> SolveStatus {
            self.solves.fetch_add(1, Ordering::Relaxed);
            let over = self
                .rhs
                .iter()
                .zip(&self.infeasible_above)
                .any(|(r, t)| r > t);
            if over {
                SolveStatus::Infeasible
            } else {
                SolveStatus::Optimal
            }
        }

        fn objective_value(&self, i: usize) -> f64 {
            if i == 0 {
                100.0 - self.rhs.iter().sum::<f64>()
            } else {
                self.rhs[i - 1]
            }
        }

        fn slack_value(&self, _o: usize) -> f64 {
            self.slack
        }

        fn variable_values(&self) -> BTreeMap<String, f64> {
            BTreeMap::new()
        }

        fn fork(&self) -> Box<dyn ObjectiveSolver> {
            Box::new(self.clone())
        }
    }

    fn levels(gp: usize, n_con: usize, max: f64) -> Arc<GridLevels> {
        let step = max / (gp - 1) as f64;
        Arc::new(GridLevels {
            levels: vec![(0..gp).map(|j| j as f64 * step).collect(); n_con],
            range: vec![max; n_con],
            grid_points: gp,
        })
    }

    fn run_worker(
        gp: usize,
        n_con: usize,
        solver: StubSolver,
        opts: WorkerOptions,
        flag: Flag,
    ) -> (Vec<Candidate>, Arc<AtomicUsize>, Arc<ProgressCounters>) {
        let solves = Arc::clone(&solver.solves);
        let grid = enumerate_grid(gp, n_con + 1, false);
        let queues = Arc::new(WorkQueues::split(grid, gp, 1, false));
        let counters = Arc::new(ProgressCounters::new());
        let worker = SolverWorker::new(
            0,
            opts,
            Box::new(solver),
            levels(gp, n_con, 10.0),
            queues,
            Arc::new(flag),
            Arc::clone(&counters),
        );
        (worker.run(), solves, counters)
    }

    fn plain_opts() -> WorkerOptions {
        WorkerOptions {
            early_exit: false,
            bypass_coefficient: false,
            penalty_weight: 1e-3,
        }
    }

    #[test]
    fn test_solves_every_point_without_acceleration() {
        let solver = StubSolver::new(vec![f64::INFINITY], 0.0);
        let (found, solves, counters) =
            run_worker(5, 1, solver, plain_opts(), Flag::disabled());
        assert_eq!(found.len(), 5);
        assert_eq!(solves.load(Ordering::Relaxed), 5);
        assert_eq!(counters.visited(), 5);
        assert_eq!(counters.models_solved(), 5);
    }

    #[test]
    fn test_recorded_values_subtract_penalty() {
        // Slack 2.0 over range 10.0 with eps 1e-3: the recorded primary
        // value is objective_value(0) minus 2e-4.
        let solver = StubSolver::new(vec![f64::INFINITY], 2.0);
        let (found, _, _) = run_worker(2, 1, solver, plain_opts(), Flag::disabled());
        assert_eq!(found.len(), 2);
        // First point: rhs 0, objective 100, penalty 1e-3 * 2/10.
        assert!((found[0].objectives[0] - (100.0 - 2e-4)).abs() < 1e-12);
        assert_eq!(found[0].objectives[1], 0.0);
    }

    #[test]
    fn test_early_exit_skips_rest_of_row() {
        // Levels are 0, 2.5, 5, 7.5, 10; points above 4.0 are infeasible.
        // The first infeasible solve (index 2) must be the last solve.
        let solver = StubSolver::new(vec![4.0], 0.0);
        let opts = WorkerOptions {
            early_exit: true,
            ..plain_opts()
        };
        let (found, solves, counters) = run_worker(5, 1, solver, opts, Flag::disabled());
        assert_eq!(found.len(), 2);
        assert_eq!(solves.load(Ordering::Relaxed), 3);
        assert_eq!(counters.infeasibilities(), 1);
        // Every point was still visited (skips count as visits).
        assert_eq!(counters.visited(), 5);
    }

    #[test]
    fn test_bypass_jump_skips_dominated_levels() {
        // Constant slack 5.0, step 2.5: b = 2, so after each solve two
        // levels are skipped. Solved indices: 0 and 3; index 4 is skipped
        // by the jump from index 3 (bounded by the row end).
        let solver = StubSolver::new(vec![f64::INFINITY], 5.0);
        let opts = WorkerOptions {
            bypass_coefficient: true,
            ..plain_opts()
        };
        let (found, solves, _) = run_worker(5, 1, solver, opts, Flag::enabled());
        assert_eq!(solves.load(Ordering::Relaxed), 2);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_flag_hit_triggers_jump() {
        // Pre-flag coordinate 1 with skip distance 2: the worker solves 0,
        // then skips 1 and 2, then solves 3 and 4.
        let flag = Flag::enabled();
        flag.set(&[1..2], 2);
        let solver = StubSolver::new(vec![f64::INFINITY], 0.0);
        let (found, solves, _) = run_worker(5, 1, solver, plain_opts(), flag);
        assert_eq!(solves.load(Ordering::Relaxed), 3);
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_infeasible_flags_future_rows() {
        // Two axes, 4 levels each. Axis-1 level index 2 or higher makes the
        // model infeasible (levels 0, 3.33, 6.67, 10 with threshold 5).
        let solver = StubSolver::new(vec![f64::INFINITY, 5.0], 0.0);
        let solves = Arc::clone(&solver.solves);
        let gp = 4;
        let grid = enumerate_grid(gp, 3, false);
        let queues = Arc::new(WorkQueues::split(grid, gp, 1, false));
        let counters = Arc::new(ProgressCounters::new());
        let flag = Arc::new(Flag::enabled());
        let step = 10.0 / 3.0;
        let grid_levels = Arc::new(GridLevels {
            levels: vec![(0..gp).map(|j| j as f64 * step).collect(); 2],
            range: vec![10.0; 2],
            grid_points: gp,
        });
        let opts = WorkerOptions {
            early_exit: true,
            ..plain_opts()
        };
        let worker = SolverWorker::new(
            0,
            opts,
            Box::new(solver),
            grid_levels,
            queues,
            Arc::clone(&flag),
            counters,
        );
        let found = worker.run();

        // Rows with axis-1 index 0 or 1 are fully feasible (4 solves each).
        // Rows 2 and 3 go infeasible at their first point; the flag map
        // plus the in-row jump suppress everything after that first solve.
        assert_eq!(solves.load(Ordering::Relaxed), 2 * gp + 2);
        assert_eq!(found.len(), 2 * gp);
        assert!(!flag.is_empty());
    }
}
