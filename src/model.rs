//! Multi-objective model preparation.
//!
//! [`MooModel`] wraps the external solver and performs everything that
//! happens before the grid search: direction normalization, payoff-table
//! construction, objective-range estimation, and installation of the
//! epsilon-constraint structure.

use std::sync::Arc;

use tracing::info;

use crate::config::AugmeconConfig;
use crate::progress::ProgressCounters;
use crate::types::{AugmeconError, ObjectiveSense, ObjectiveSolver};

/// Grid levels and ranges of the constrained objectives, shared read-only
/// with every worker.
#[derive(Debug, Clone)]
pub struct GridLevels {
    /// `levels[o][j]` is the j-th constraint level of constrained index `o`.
    pub levels: Vec<Vec<f64>>,
    /// Range (max - nadir) per constrained index.
    pub range: Vec<f64>,
    /// Levels per axis.
    pub grid_points: usize,
}

/// The prepared multi-objective model.
pub struct MooModel {
    solver: Box<dyn ObjectiveSolver>,
    n_obj: usize,
    /// +1 for originally-maximized objectives, -1 for minimized ones.
    direction: Vec<f64>,
    /// Payoff matrix in the normalized (maximize-all) space.
    payoff: Vec<Vec<f64>>,
    counters: Arc<ProgressCounters>,
}

impl MooModel {
    /// Wraps a solver, rejecting models with fewer than two objectives.
    pub fn new(
        solver: Box<dyn ObjectiveSolver>,
        counters: Arc<ProgressCounters>,
    ) -> Result<Self, AugmeconError> {
        let n_obj = solver.objective_count();
        if n_obj < 2 {
            return Err(AugmeconError::Config(
                "at least 2 objective functions are required".into(),
            ));
        }
        Ok(Self {
            solver,
            n_obj,
            direction: vec![1.0; n_obj],
            payoff: Vec::new(),
            counters,
        })
    }

    /// Number of objectives.
    pub fn n_obj(&self) -> usize {
        self.n_obj
    }

    /// Number of constrained objectives.
    pub fn n_constrained(&self) -> usize {
        self.n_obj - 1
    }

    /// Direction multipliers (+1 maximize, -1 minimize) of the original
    /// objectives.
    pub fn direction(&self) -> &[f64] {
        &self.direction
    }

    /// Payoff matrix in the normalized space.
    pub fn payoff(&self) -> &[Vec<f64>] {
        &self.payoff
    }

    /// Payoff matrix with the original objective directions restored.
    pub fn payoff_restored(&self) -> Vec<Vec<f64>> {
        self.payoff
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.direction)
                    .map(|(v, d)| v * d)
                    .collect()
            })
            .collect()
    }

    /// Converts every minimize objective to maximize by sign inversion,
    /// recording the multiplier needed to undo the transform on output.
    pub fn min_to_max(&mut self) {
        for i in 0..self.n_obj {
            if self.solver.objective_sense(i) == ObjectiveSense::Minimize {
                self.solver.negate_objective(i);
                self.direction[i] = -1.0;
            }
        }
    }

    /// Builds the payoff matrix.
    ///
    /// Diagonal entries first (each objective optimized alone), then each
    /// row `i` with objective `i` pinned at its own optimum and every other
    /// objective solved in sequence, pinning each as it is reached so the
    /// row is lexicographic. Pins are cleared after each row.
    pub fn construct_payoff(&mut self) -> Result<(), AugmeconError> {
        info!("constructing payoff table");
        let n = self.n_obj;
        self.payoff = vec![vec![f64::INFINITY; n]; n];

        for i in 0..n {
            self.payoff[i][i] = self.solve_objective(i)?;
        }

        for i in 0..n {
            self.solver.pin_objective(i, self.payoff[i][i]);
            for j in 0..n {
                if j != i {
                    let value = self.solve_objective(j)?;
                    self.payoff[i][j] = value;
                    self.solver.pin_objective(j, value);
                }
            }
            self.solver.clear_pinned_objectives();
        }
        Ok(())
    }

    /// Solves with only objective `j` active and returns its value.
    fn solve_objective(&mut self, j: usize) -> Result<f64, AugmeconError> {
        self.solver.activate_objective(j);
        let status = self.solver.solve();
        self.counters.visit();
        self.counters.solved();
        self.solver.deactivate_objective(j);
        if !status.is_optimal() {
            return Err(AugmeconError::PayoffSolve {
                objective: j,
                status,
            });
        }
        Ok(self.solver.objective_value(j))
    }

    /// Derives per-objective ranges and evenly spaced constraint levels
    /// from the payoff table (or user-supplied nadir points).
    pub fn find_obj_range(&self, config: &AugmeconConfig) -> GridLevels {
        info!("finding objective function ranges");
        let gp = config.grid_points;
        let mut levels = Vec::with_capacity(self.n_constrained());
        let mut range = Vec::with_capacity(self.n_constrained());

        for o in 0..self.n_constrained() {
            let column: Vec<f64> = self.payoff.iter().map(|row| row[o + 1]).collect();
            let col_min = column.iter().copied().fold(f64::INFINITY, f64::min);
            let col_max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            let obj_min = match &config.nadir_points {
                Some(nadir) => nadir[o],
                None => config.nadir_ratio * col_min,
            };
            range.push(col_max - obj_min);

            // Evenly spaced levels with the endpoint pinned exactly.
            let step = (col_max - obj_min) / (gp - 1) as f64;
            levels.push(
                (0..gp)
                    .map(|j| {
                        if j == gp - 1 {
                            col_max
                        } else {
                            obj_min + j as f64 * step
                        }
                    })
                    .collect(),
            );
        }

        GridLevels {
            levels,
            range,
            grid_points: gp,
        }
    }

    /// Turns the constrained objectives into slack-equality constraints and
    /// augments the primary objective with the weighted penalty terms.
    pub fn convert_problem(&mut self, config: &AugmeconConfig, grid: &GridLevels) {
        info!("converting optimization problem");
        self.solver
            .install_slack_constraints(config.penalty_weight, &grid.range);
    }

    /// A self-contained solver copy for one worker.
    pub fn fork_solver(&self) -> Box<dyn ObjectiveSolver> {
        self.solver.fork()
    }
}
