//! Run orchestration.
//!
//! [`AugmeconRunner`] drives a complete run: validate, normalize
//! directions, build the payoff table, derive the grid, partition the work,
//! spawn one worker thread per queue, monitor progress and the optional
//! timeout, then aggregate the collected batches into the final result.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::aggregate::{aggregate, SolutionSets};
use crate::config::{AugmeconConfig, WorkerFailurePolicy};
use crate::flag::Flag;
use crate::grid::enumerate_grid;
use crate::hypervolume::hypervolume;
use crate::model::MooModel;
use crate::progress::ProgressCounters;
use crate::queue::WorkQueues;
use crate::types::{AugmeconError, Candidate, ObjectiveSolver, RunStatus};
use crate::worker::{SolverWorker, WorkerOptions};

/// What one worker thread reports back on exit.
enum WorkerReport {
    Batch(Vec<Candidate>),
    Lost(usize),
}

/// Outcome of a run: the payoff table, grid levels, solution sets, and run
/// statistics. Objective tuples are reported in the original directions.
#[derive(Debug)]
pub struct AugmeconResult {
    /// Run name, copied from the configuration.
    pub name: String,
    /// Payoff matrix with original objective directions.
    pub payoff: Vec<Vec<f64>>,
    /// Constraint levels per constrained index, in the normalized
    /// (maximize-all) space the search ran in.
    pub grid_levels: Vec<Vec<f64>>,
    /// Every recorded candidate, deduplicated by exact tuple.
    pub sols: Vec<Candidate>,
    /// Candidates deduplicated after rounding.
    pub unique_sols: Vec<Candidate>,
    /// The non-dominated subset of `unique_sols`.
    pub unique_pareto_sols: Vec<Candidate>,
    /// Hypervolume of the Pareto set against the payoff diagonal.
    pub hypervolume: f64,
    /// How the run ended; anything but `Complete` means the solution sets
    /// are partial.
    pub status: RunStatus,
    /// Sub-problems handed to the solver (payoff plus traversal).
    pub models_solved: usize,
    /// Infeasible traversal outcomes.
    pub infeasibilities: usize,
    /// Wall-clock duration of the run.
    pub runtime: Duration,
}

impl AugmeconResult {
    /// Pareto-optimal objective tuples, in first-found order.
    pub fn pareto_solutions(&self) -> Vec<Vec<f64>> {
        self.unique_pareto_sols
            .iter()
            .map(|c| c.objectives.clone())
            .collect()
    }

    /// The payoff matrix.
    pub fn payoff_table(&self) -> &[Vec<f64>] {
        &self.payoff
    }

    /// Decision variables of the Pareto solution with exactly these
    /// objective values (as returned by
    /// [`pareto_solutions`](AugmeconResult::pareto_solutions)).
    pub fn decision_variables(
        &self,
        solution: &[f64],
    ) -> Result<&BTreeMap<String, f64>, AugmeconError> {
        self.unique_pareto_sols
            .iter()
            .find(|c| c.objectives == solution)
            .map(|c| &c.variables)
            .ok_or_else(|| AugmeconError::SolutionNotFound(solution.to_vec()))
    }
}

/// Executes the AUGMECON grid search.
pub struct AugmeconRunner;

impl AugmeconRunner {
    /// Runs the full algorithm on `solver` under `config`.
    ///
    /// Returns a configuration or payoff error before any grid work
    /// starts; timeouts and lost workers do not fail the run — they yield
    /// a result whose [`status`](AugmeconResult::status) says it is
    /// partial.
    pub fn run(
        solver: Box<dyn ObjectiveSolver>,
        config: &AugmeconConfig,
    ) -> Result<AugmeconResult, AugmeconError> {
        let n_obj = solver.objective_count();
        config.validate(n_obj).map_err(AugmeconError::Config)?;

        info!(
            name = %config.name,
            grid_points = config.grid_points,
            cpu_count = config.cpu_count,
            early_exit = config.early_exit,
            bypass_coefficient = config.bypass_coefficient,
            flag_array = config.flag_array,
            shared_flag = config.shared_flag,
            redivide_work = config.redivide_work,
            "starting run"
        );

        let started = Instant::now();
        let deadline = config.process_timeout.map(|t| started + t);

        let counters = Arc::new(ProgressCounters::new());
        let total = config
            .grid_points
            .saturating_pow((n_obj - 1) as u32)
            .saturating_add(n_obj * n_obj);
        counters.set_total(total);

        // Preparation: normalize, payoff, ranges, conversion.
        let mut model = MooModel::new(solver, Arc::clone(&counters))?;
        model.min_to_max();
        model.construct_payoff()?;
        let grid_levels = Arc::new(model.find_obj_range(config));
        model.convert_problem(config, &grid_levels);

        // Partition the traversal order into per-worker queues of rows.
        let grid = enumerate_grid(config.grid_points, n_obj, false);
        let queues = Arc::new(WorkQueues::split(
            grid,
            config.grid_points,
            config.cpu_count,
            config.redivide_work,
        ));
        let worker_count = queues.worker_count();
        info!(workers = worker_count, "dividing grid over worker threads");

        let shared_flag = if config.flag_array && config.shared_flag {
            Some(Arc::new(Flag::enabled()))
        } else {
            None
        };

        let worker_opts = WorkerOptions {
            early_exit: config.early_exit,
            bypass_coefficient: config.bypass_coefficient,
            penalty_weight: config.penalty_weight,
        };

        let (tx, rx) = mpsc::channel::<WorkerReport>();
        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let flag = match &shared_flag {
                Some(f) => Arc::clone(f),
                None if config.flag_array => Arc::new(Flag::enabled()),
                None => Arc::new(Flag::disabled()),
            };
            let worker = SolverWorker::new(
                id,
                worker_opts.clone(),
                model.fork_solver(),
                Arc::clone(&grid_levels),
                Arc::clone(&queues),
                flag,
                Arc::clone(&counters),
            );
            let tx = tx.clone();
            let queues = Arc::clone(&queues);
            let policy = config.worker_failure;
            let handle = thread::Builder::new()
                .name(format!("augmecon-worker-{id}"))
                .spawn(move || {
                    let report = match catch_unwind(AssertUnwindSafe(|| worker.run())) {
                        Ok(batch) => WorkerReport::Batch(batch),
                        Err(_) => {
                            if policy == WorkerFailurePolicy::Abort {
                                queues.drain();
                            }
                            WorkerReport::Lost(id)
                        }
                    };
                    let _ = tx.send(report);
                })
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }
        drop(tx);

        // Monitor loop: collect exactly one report per worker, polling the
        // deadline and the progress display between arrivals.
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template("[{bar:40}] {percent}% ({msg})") {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_message("finding solutions");

        let mut batches = Vec::with_capacity(worker_count);
        let mut lost_workers = 0usize;
        let mut timed_out = false;
        while batches.len() + lost_workers < worker_count {
            if let Some(deadline) = deadline {
                if !timed_out && Instant::now() >= deadline {
                    warn!("process timeout reached, draining remaining work");
                    queues.drain();
                    timed_out = true;
                }
            }
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(WorkerReport::Batch(batch)) => batches.push(batch),
                Ok(WorkerReport::Lost(id)) => {
                    warn!(worker = id, "worker lost; result will be partial");
                    lost_workers += 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            bar.set_position(counters.visited().min(total) as u64);
        }
        for handle in handles {
            let _ = handle.join();
        }
        bar.finish_and_clear();

        // Aggregate and restore the original objective directions.
        let sets = aggregate(batches, config.round_decimals, model.direction());
        let SolutionSets {
            sols,
            unique_sols,
            unique_pareto_sols,
        } = sets;

        let payoff = model.payoff_restored();
        let reference: Vec<f64> = (0..n_obj).map(|i| payoff[i][i]).collect();
        let front: Vec<Vec<f64>> = unique_pareto_sols
            .iter()
            .map(|c| c.objectives.clone())
            .collect();
        let hv = hypervolume(&front, &reference);

        let status = if lost_workers > 0 {
            RunStatus::WorkerLost
        } else if timed_out {
            RunStatus::TimedOut
        } else {
            RunStatus::Complete
        };

        let result = AugmeconResult {
            name: config.name.clone(),
            payoff,
            grid_levels: grid_levels.levels.clone(),
            sols,
            unique_sols,
            unique_pareto_sols,
            hypervolume: hv,
            status,
            models_solved: counters.models_solved(),
            infeasibilities: counters.infeasibilities(),
            runtime: started.elapsed(),
        };

        info!(
            runtime_secs = result.runtime.as_secs_f64(),
            models_solved = result.models_solved,
            infeasibilities = result.infeasibilities,
            solutions = result.sols.len(),
            unique_solutions = result.unique_sols.len(),
            unique_pareto_solutions = result.unique_pareto_sols.len(),
            hypervolume = result.hypervolume,
            status = ?result.status,
            "run finished"
        );

        if let Some(path) = &config.output_json {
            if let Err(err) = crate::export::write_json(path, &result) {
                warn!(path = %path.display(), error = %err, "failed to write export artifact");
            }
        }

        Ok(result)
    }
}
