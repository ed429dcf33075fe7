//! Shared pruning state.
//!
//! The flag map records, per grid coordinate, how many subsequent points
//! along axis 0 are known safe to skip (infeasible or already dominated).
//! Workers read it before solving and write it after an infeasible or
//! bypass-eligible solve.

use std::collections::HashMap;
use std::ops::Range;

use parking_lot::Mutex;

use crate::grid::GridCoord;

/// Skip-distance map keyed by full grid coordinates.
///
/// Writes merge with `max`: a concurrent smaller hint never clobbers a
/// larger one, so `set` calls are commutative across workers. A disabled
/// flag accepts writes and answers every lookup with 0.
///
/// Each `set` covers a Cartesian product of per-axis index ranges and is
/// applied atomically under one lock acquisition, keeping lock traffic per
/// write-batch rather than per key.
#[derive(Debug)]
pub struct Flag {
    map: Option<Mutex<HashMap<GridCoord, usize>>>,
}

impl Flag {
    /// A no-op flag: every lookup returns 0.
    pub fn disabled() -> Self {
        Self { map: None }
    }

    /// An active flag with an empty map.
    pub fn enabled() -> Self {
        Self {
            map: Some(Mutex::new(HashMap::new())),
        }
    }

    /// Whether this flag stores anything at all.
    pub fn is_enabled(&self) -> bool {
        self.map.is_some()
    }

    /// Sets `value` for every coordinate in the Cartesian product of
    /// `axis_ranges`, never decreasing an already-stored value.
    pub fn set(&self, axis_ranges: &[Range<usize>], value: usize) {
        let Some(map) = &self.map else { return };
        if axis_ranges.iter().any(|r| r.is_empty()) {
            return;
        }

        let mut guard = map.lock();
        let mut cursor: Vec<usize> = axis_ranges.iter().map(|r| r.start).collect();
        loop {
            let entry = guard.entry(cursor.clone()).or_insert(0);
            if value > *entry {
                *entry = value;
            }

            // Odometer increment over the per-axis ranges.
            let mut axis = 0;
            loop {
                cursor[axis] += 1;
                if cursor[axis] < axis_ranges[axis].end {
                    break;
                }
                cursor[axis] = axis_ranges[axis].start;
                axis += 1;
                if axis == axis_ranges.len() {
                    return;
                }
            }
        }
    }

    /// Stored skip distance for `coord`, or 0 if unset.
    pub fn get(&self, coord: &[usize]) -> usize {
        match &self.map {
            Some(map) => map.lock().get(coord).copied().unwrap_or(0),
            None => 0,
        }
    }

    /// Number of flagged coordinates (0 when disabled).
    pub fn len(&self) -> usize {
        match &self.map {
            Some(map) => map.lock().len(),
            None => 0,
        }
    }

    /// Whether no coordinate is flagged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
