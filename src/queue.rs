//! Work partitioning and redistribution.
//!
//! The ordered grid is chopped into rows of `gp` consecutive coordinates
//! (one fixed setting of every axis but axis 0) and the rows are dealt out
//! as contiguous chunks, one queue per worker. A row is never split across
//! workers: the jump logic inside a row depends on axis 0 advancing
//! contiguously.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::grid::GridCoord;

/// Per-worker job queues over grid rows, with optional whole-queue stealing.
#[derive(Debug)]
pub struct WorkQueues {
    queues: Vec<Mutex<VecDeque<Vec<GridCoord>>>>,
    redivide: bool,
}

impl WorkQueues {
    /// Splits the ordered grid into at most `workers` queues of whole rows.
    ///
    /// Chunk sizes differ by at most one row (earlier queues get the larger
    /// share); workers beyond the number of rows end up without a queue.
    pub fn split(grid: Vec<GridCoord>, gp: usize, workers: usize, redivide: bool) -> Self {
        let rows: Vec<Vec<GridCoord>> = {
            let mut rows = Vec::with_capacity(grid.len().div_ceil(gp));
            let mut grid = grid;
            while !grid.is_empty() {
                let rest = grid.split_off(gp.min(grid.len()));
                rows.push(std::mem::replace(&mut grid, rest));
            }
            rows
        };

        let workers = workers.max(1);
        let base = rows.len() / workers;
        let extra = rows.len() % workers;

        let mut queues = Vec::new();
        let mut iter = rows.into_iter();
        for w in 0..workers {
            let take = base + usize::from(w < extra);
            if take == 0 {
                continue;
            }
            let chunk: VecDeque<Vec<GridCoord>> = iter.by_ref().take(take).collect();
            queues.push(Mutex::new(chunk));
        }

        Self { queues, redivide }
    }

    /// Number of non-empty queues created, i.e. the number of workers to
    /// actually spawn.
    pub fn worker_count(&self) -> usize {
        self.queues.len()
    }

    /// Fetches the next row for worker `own`.
    ///
    /// Pops from the worker's own queue first. When that is empty and
    /// stealing is enabled, the worker takes the entire content of the
    /// currently longest queue, keeps the surplus for itself, and returns
    /// the first stolen row. Returns `None` when no work is left (never
    /// blocks).
    pub fn get_work(&self, own: usize) -> Option<Vec<GridCoord>> {
        if let Some(row) = self.queues[own].lock().pop_front() {
            return Some(row);
        }
        if !self.redivide {
            return None;
        }

        // Bounded retry: a failed steal means another worker raced us to
        // the victim, so look again at most once per queue.
        for _ in 0..self.queues.len() {
            let victim = self.longest_queue(own)?;
            let mut stolen = std::mem::take(&mut *self.queues[victim].lock());
            let Some(first) = stolen.pop_front() else {
                continue;
            };
            if !stolen.is_empty() {
                self.queues[own].lock().append(&mut stolen);
            }
            return Some(first);
        }
        None
    }

    /// Index of the longest queue other than `own`, or `None` if every
    /// other queue is empty.
    fn longest_queue(&self, own: usize) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (i, q) in self.queues.iter().enumerate() {
            if i == own {
                continue;
            }
            let len = q.lock().len();
            if len > 0 && best.map_or(true, |(_, b)| len > b) {
                best = Some((i, len));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Empties every queue so all workers stop at their next fetch.
    pub fn drain(&self) {
        for q in &self.queues {
            q.lock().clear();
        }
    }

    /// Rows still queued across all workers.
    pub fn remaining_rows(&self) -> usize {
        self.queues.iter().map(|q| q.lock().len()).sum()
    }
}
