//! Result export.
//!
//! Writes the payoff table, grid levels, and the three solution sets as a
//! single JSON document, the file-artifact counterpart of the run summary
//! logged at completion.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use serde::Serialize;

use crate::{AugmeconResult, Candidate, RunStatus};

/// Serialized form of one run.
#[derive(Serialize)]
struct ExportDocument<'a> {
    name: &'a str,
    status: RunStatus,
    runtime_seconds: f64,
    models_solved: usize,
    infeasibilities: usize,
    hypervolume: f64,
    payoff_table: &'a [Vec<f64>],
    e_points: &'a [Vec<f64>],
    sols: &'a [Candidate],
    unique_sols: &'a [Candidate],
    unique_pareto_sols: &'a [Candidate],
}

/// Writes `result` as pretty-printed JSON to `path`.
pub fn write_json(path: &Path, result: &AugmeconResult) -> io::Result<()> {
    let doc = ExportDocument {
        name: &result.name,
        status: result.status,
        runtime_seconds: result.runtime.as_secs_f64(),
        models_solved: result.models_solved,
        infeasibilities: result.infeasibilities,
        hypervolume: result.hypervolume,
        payoff_table: &result.payoff,
        e_points: &result.grid_levels,
        sols: &result.sols,
        unique_sols: &result.unique_sols,
        unique_pareto_sols: &result.unique_pareto_sols,
    };
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, &doc).map_err(io::Error::from)
}
