//! Multi-objective optimization via the augmented epsilon-constraint
//! method (AUGMECON).
//!
//! Every objective but the first becomes a constraint, the constrained
//! objectives' ranges are sampled on a grid, and one single-objective
//! sub-problem is solved per grid point by an external solver behind the
//! [`ObjectiveSolver`] trait. The non-dominated subset of the collected
//! optima is the Pareto front.
//!
//! The traversal is accelerated by early exit (an infeasible point rules
//! out the rest of its row), the bypass coefficient (an optimum's slack
//! rules out the levels it already covers), and a shared flag map that
//! carries those skip hints across rows and worker threads.
//!
//! # Key Types
//!
//! - [`ObjectiveSolver`]: the external single-objective solve capability
//! - [`AugmeconConfig`]: run parameters (grid density, accelerations,
//!   parallelism, timeout)
//! - [`AugmeconRunner`]: executes a run
//! - [`AugmeconResult`]: payoff table, solution sets, and run statistics
//!
//! # Submodules
//!
//! - [`grid`]: traversal-order enumeration of the search grid
//! - [`hypervolume`]: hypervolume indicator of the final front
//! - [`lp`]: a self-contained LP modeling layer and simplex solver
//!   implementing [`ObjectiveSolver`], used for tests, benches, and small
//!   standalone models
//! - [`export`]: JSON export of a finished run
//!
//! # Example
//!
//! ```
//! use augmecon::{AugmeconConfig, AugmeconRunner, ObjectiveSense};
//! use augmecon::lp::{Cmp, LpModel, SimplexSolver};
//!
//! // max x1 and max 3x1 + 4x2 subject to
//! // x1 <= 20, x2 <= 40, 5x1 + 4x2 <= 200.
//! let mut model = LpModel::new();
//! let x1 = model.add_var("x1", 0.0);
//! let x2 = model.add_var("x2", 0.0);
//! model.add_constraint(&[(x1, 1.0)], Cmp::Le, 20.0);
//! model.add_constraint(&[(x2, 1.0)], Cmp::Le, 40.0);
//! model.add_constraint(&[(x1, 5.0), (x2, 4.0)], Cmp::Le, 200.0);
//! model.add_objective(&[(x1, 1.0)], ObjectiveSense::Maximize);
//! model.add_objective(&[(x1, 3.0), (x2, 4.0)], ObjectiveSense::Maximize);
//!
//! let config = AugmeconConfig::new(10).with_cpu_count(1);
//! let result = AugmeconRunner::run(Box::new(SimplexSolver::new(model)), &config).unwrap();
//! assert_eq!(result.pareto_solutions().len(), 10);
//! ```
//!
//! # References
//!
//! - Mavrotas (2009), "Effective implementation of the epsilon-constraint
//!   method in Multi-Objective Mathematical Programming problems"
//! - Mavrotas & Florios (2013), "An improved version of the augmented
//!   epsilon-constraint method (AUGMECON2)"

mod aggregate;
mod config;
mod flag;
pub mod grid;
pub mod hypervolume;
mod model;
mod progress;
mod queue;
mod runner;
pub mod types;
mod worker;

pub mod export;
pub mod lp;

pub use aggregate::{aggregate, undominated_mask, SolutionSets};
pub use config::{AugmeconConfig, WorkerFailurePolicy};
pub use model::{GridLevels, MooModel};
pub use runner::{AugmeconResult, AugmeconRunner};
pub use types::{
    AugmeconError, Candidate, ObjectiveSense, ObjectiveSolver, RunStatus, SolveStatus,
};
