//! Engine configuration.
//!
//! [`AugmeconConfig`] holds all parameters that control the grid search.
//! Parsing from files or CLI flags is the caller's concern; the engine
//! consumes the resolved struct.

use std::path::PathBuf;
use std::time::Duration;

/// What to do when a worker dies mid-run (solver crash or panic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerFailurePolicy {
    /// Log the loss, let the other workers finish, and return a partial
    /// result flagged as such.
    ContinuePartial,
    /// Drain the remaining work so every worker stops at its next fetch,
    /// then return what was collected.
    Abort,
}

/// Configuration for one AUGMECON run.
///
/// `grid_points` is the only required parameter; everything else has a
/// working default.
///
/// # Builder Pattern
///
/// ```
/// use augmecon::augmecon::AugmeconConfig;
///
/// let config = AugmeconConfig::new(10)
///     .with_cpu_count(4)
///     .with_round_decimals(2)
///     .with_redivide_work(true);
/// assert_eq!(config.grid_points, 10);
/// ```
#[derive(Debug, Clone)]
pub struct AugmeconConfig {
    /// Run name, used for log lines and the export artifact.
    pub name: String,

    /// Number of grid levels per constrained objective. The search space
    /// has `grid_points^(n_obj - 1)` points.
    pub grid_points: usize,

    /// User-supplied nadir values, one per constrained objective.
    ///
    /// When absent, the nadir is estimated from the payoff table column
    /// minimum scaled by `nadir_ratio`.
    pub nadir_points: Option<Vec<f64>>,

    /// Skip the rest of a grid row once a point proves infeasible.
    pub early_exit: bool,

    /// Skip grid points already dominated by the current optimum's slack.
    pub bypass_coefficient: bool,

    /// Record skip distances in the shared flag map so other rows and
    /// workers can prune without re-solving.
    pub flag_array: bool,

    /// Share one flag map across all workers instead of one per worker.
    pub shared_flag: bool,

    /// Decimal places used to deduplicate numerically identical solutions.
    pub round_decimals: u32,

    /// Penalty weight `eps` of the augmented objective.
    pub penalty_weight: f64,

    /// Scale factor applied to the payoff column minimum when estimating
    /// the nadir point.
    pub nadir_ratio: f64,

    /// Number of worker threads.
    pub cpu_count: usize,

    /// Let an idle worker steal the longest remaining queue.
    pub redivide_work: bool,

    /// Optional wall-clock limit; on expiry the remaining work is drained
    /// and the run returns a partial result.
    pub process_timeout: Option<Duration>,

    /// Escalation policy for a worker that dies mid-run.
    pub worker_failure: WorkerFailurePolicy,

    /// When set, write the payoff table, grid levels, and solution sets as
    /// a JSON document to this path.
    pub output_json: Option<PathBuf>,
}

impl AugmeconConfig {
    /// Creates a configuration with the given grid density and defaults
    /// for everything else.
    pub fn new(grid_points: usize) -> Self {
        Self {
            name: "augmecon".to_string(),
            grid_points,
            nadir_points: None,
            early_exit: true,
            bypass_coefficient: true,
            flag_array: true,
            shared_flag: true,
            round_decimals: 2,
            penalty_weight: 1e-3,
            nadir_ratio: 1.0,
            cpu_count: default_cpu_count(),
            redivide_work: true,
            process_timeout: None,
            worker_failure: WorkerFailurePolicy::ContinuePartial,
            output_json: None,
        }
    }

    /// Sets the run name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the user-supplied nadir values.
    pub fn with_nadir_points(mut self, nadir: Vec<f64>) -> Self {
        self.nadir_points = Some(nadir);
        self
    }

    /// Enables or disables early exit on infeasibility.
    pub fn with_early_exit(mut self, enabled: bool) -> Self {
        self.early_exit = enabled;
        self
    }

    /// Enables or disables the bypass-coefficient acceleration.
    pub fn with_bypass_coefficient(mut self, enabled: bool) -> Self {
        self.bypass_coefficient = enabled;
        self
    }

    /// Enables or disables the flag map.
    pub fn with_flag_array(mut self, enabled: bool) -> Self {
        self.flag_array = enabled;
        self
    }

    /// Shares one flag map across all workers (or keeps one per worker).
    pub fn with_shared_flag(mut self, shared: bool) -> Self {
        self.shared_flag = shared;
        self
    }

    /// Sets the deduplication rounding precision.
    pub fn with_round_decimals(mut self, decimals: u32) -> Self {
        self.round_decimals = decimals;
        self
    }

    /// Sets the augmented-objective penalty weight.
    pub fn with_penalty_weight(mut self, eps: f64) -> Self {
        self.penalty_weight = eps;
        self
    }

    /// Sets the nadir estimation ratio.
    pub fn with_nadir_ratio(mut self, ratio: f64) -> Self {
        self.nadir_ratio = ratio;
        self
    }

    /// Sets the worker thread count.
    pub fn with_cpu_count(mut self, count: usize) -> Self {
        self.cpu_count = count;
        self
    }

    /// Enables or disables work stealing.
    pub fn with_redivide_work(mut self, enabled: bool) -> Self {
        self.redivide_work = enabled;
        self
    }

    /// Sets the wall-clock timeout.
    pub fn with_process_timeout(mut self, timeout: Duration) -> Self {
        self.process_timeout = Some(timeout);
        self
    }

    /// Sets the worker-failure escalation policy.
    pub fn with_worker_failure(mut self, policy: WorkerFailurePolicy) -> Self {
        self.worker_failure = policy;
        self
    }

    /// Sets the JSON export target.
    pub fn with_output_json(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_json = Some(path.into());
        self
    }

    /// Validates the configuration against a model with `n_obj` objectives.
    ///
    /// Returns `Err` with a description if any parameter is invalid.
    pub fn validate(&self, n_obj: usize) -> Result<(), String> {
        if self.grid_points < 2 {
            return Err("grid_points must be at least 2".into());
        }
        if n_obj < 2 {
            return Err("at least 2 objective functions are required".into());
        }
        if let Some(nadir) = &self.nadir_points {
            if nadir.len() != n_obj - 1 {
                return Err(format!(
                    "expected {} nadir points, got {}",
                    n_obj - 1,
                    nadir.len()
                ));
            }
        }
        if self.cpu_count == 0 {
            return Err("cpu_count must be at least 1".into());
        }
        if self.penalty_weight <= 0.0 {
            return Err("penalty_weight must be positive".into());
        }
        if self.nadir_ratio <= 0.0 {
            return Err("nadir_ratio must be positive".into());
        }
        Ok(())
    }
}

/// Hardware concurrency, falling back to 1 when unavailable.
fn default_cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
