//! Result aggregation.
//!
//! Merges the per-worker candidate batches, deduplicates (exact first,
//! then after rounding), removes dominated points, and restores the
//! original objective directions.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::types::Candidate;

/// The three solution sets produced by a run, ordered by first appearance.
#[derive(Debug, Default)]
pub struct SolutionSets {
    /// Every recorded candidate, deduplicated by exact objective tuple.
    pub sols: Vec<Candidate>,
    /// Candidates deduplicated after rounding each objective value.
    pub unique_sols: Vec<Candidate>,
    /// The non-dominated subset of `unique_sols`.
    pub unique_pareto_sols: Vec<Candidate>,
}

/// Aggregates worker batches into the final solution sets.
///
/// `direction` holds the +1/-1 multipliers recorded during direction
/// normalization; they are applied to every objective tuple on the way out
/// so callers see the original senses.
pub fn aggregate(
    batches: Vec<Vec<Candidate>>,
    round_decimals: u32,
    direction: &[f64],
) -> SolutionSets {
    let sols = merge_exact(batches);

    // Round first, deduplicate second: numerically identical points then
    // collapse onto one key instead of surviving as near-duplicates.
    let rounded = sols.iter().map(|c| Candidate {
        objectives: c
            .objectives
            .iter()
            .map(|&v| round_to(v, round_decimals))
            .collect(),
        variables: c.variables.clone(),
    });
    let unique_sols = dedup_keyed(rounded);

    let points: Vec<&[f64]> = unique_sols.iter().map(|c| c.objectives.as_slice()).collect();
    let keep = undominated_mask(&points);
    let unique_pareto_sols: Vec<Candidate> = unique_sols
        .iter()
        .zip(&keep)
        .filter(|(_, &k)| k)
        .map(|(c, _)| c.clone())
        .collect();

    SolutionSets {
        sols: restore_direction(sols, direction),
        unique_sols: restore_direction(unique_sols, direction),
        unique_pareto_sols: restore_direction(unique_pareto_sols, direction),
    }
}

/// Merges batches keyed by the exact objective tuple. A later duplicate
/// replaces the stored payload but keeps the original position.
fn merge_exact(batches: Vec<Vec<Candidate>>) -> Vec<Candidate> {
    dedup_keyed(batches.into_iter().flatten())
}

fn dedup_keyed(candidates: impl Iterator<Item = Candidate>) -> Vec<Candidate> {
    let mut order: Vec<Candidate> = Vec::new();
    let mut index: HashMap<Vec<u64>, usize> = HashMap::new();
    for candidate in candidates {
        let key = tuple_key(&candidate.objectives);
        match index.get(&key) {
            Some(&at) => order[at] = candidate,
            None => {
                index.insert(key, order.len());
                order.push(candidate);
            }
        }
    }
    order
}

/// Bit-exact hash key for an objective tuple, with negative zero folded
/// into zero so `-0.0` and `0.0` deduplicate together.
fn tuple_key(values: &[f64]) -> Vec<u64> {
    values
        .iter()
        .map(|&v| (if v == 0.0 { 0.0f64 } else { v }).to_bits())
        .collect()
}

/// Rounds to `decimals` places, folding `-0.0` into `0.0`.
fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Marks the points not weakly dominated by any other point.
///
/// All objectives are maximized: `q` dominates `p` iff `q >= p` in every
/// coordinate and `q > p` in at least one. Assumes the input carries no
/// exact duplicates (rounding dedup runs first), so exactly one
/// representative of each value survives.
pub fn undominated_mask(points: &[&[f64]]) -> Vec<bool> {
    points
        .par_iter()
        .map(|p| !points.iter().any(|q| dominates(q, p)))
        .collect()
}

/// Whether `q` weakly dominates `p` without being equal (maximize-all).
fn dominates(q: &[f64], p: &[f64]) -> bool {
    let mut strictly_better = false;
    for (&qv, &pv) in q.iter().zip(p.iter()) {
        if qv < pv {
            return false;
        }
        if qv > pv {
            strictly_better = true;
        }
    }
    strictly_better
}

fn restore_direction(candidates: Vec<Candidate>, direction: &[f64]) -> Vec<Candidate> {
    candidates
        .into_iter()
        .map(|mut c| {
            for (v, d) in c.objectives.iter_mut().zip(direction) {
                *v *= d;
            }
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn cand(objectives: &[f64]) -> Candidate {
        Candidate {
            objectives: objectives.to_vec(),
            variables: BTreeMap::new(),
        }
    }

    #[test]
    fn test_merge_dedups_exact_tuples() {
        let sets = aggregate(
            vec![
                vec![cand(&[1.0, 2.0]), cand(&[3.0, 4.0])],
                vec![cand(&[1.0, 2.0])],
            ],
            2,
            &[1.0, 1.0],
        );
        assert_eq!(sets.sols.len(), 2);
    }

    #[test]
    fn test_round_then_dedup() {
        // 1.004 and 0.996 both round to 1.0 at 2 decimals.
        let sets = aggregate(
            vec![vec![
                cand(&[1.004, 5.0]),
                cand(&[0.996, 5.0]),
                cand(&[2.0, 3.0]),
            ]],
            2,
            &[1.0, 1.0],
        );
        assert_eq!(sets.sols.len(), 3);
        assert_eq!(sets.unique_sols.len(), 2);
        assert_eq!(sets.unique_sols[0].objectives, vec![1.0, 5.0]);
    }

    #[test]
    fn test_negative_zero_folds_into_zero() {
        let sets = aggregate(
            vec![vec![cand(&[-0.001, 1.0]), cand(&[0.0, 1.0])]],
            2,
            &[1.0, 1.0],
        );
        assert_eq!(sets.unique_sols.len(), 1);
        assert_eq!(sets.unique_sols[0].objectives[0].to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn test_dominated_points_removed() {
        let sets = aggregate(
            vec![vec![
                cand(&[1.0, 5.0]),
                cand(&[3.0, 3.0]),
                cand(&[5.0, 1.0]),
                cand(&[2.0, 2.0]), // dominated by (3, 3)
            ]],
            2,
            &[1.0, 1.0],
        );
        assert_eq!(sets.unique_sols.len(), 4);
        assert_eq!(sets.unique_pareto_sols.len(), 3);
        assert!(sets
            .unique_pareto_sols
            .iter()
            .all(|c| c.objectives != vec![2.0, 2.0]));
    }

    #[test]
    fn test_weak_dominance_removes_ties() {
        // (4, 4) weakly dominates (4, 2): equal first coordinate, strictly
        // better second.
        let sets = aggregate(
            vec![vec![cand(&[4.0, 4.0]), cand(&[4.0, 2.0])]],
            2,
            &[1.0, 1.0],
        );
        assert_eq!(sets.unique_pareto_sols.len(), 1);
        assert_eq!(sets.unique_pareto_sols[0].objectives, vec![4.0, 4.0]);
    }

    #[test]
    fn test_dominance_closure() {
        let sets = aggregate(
            vec![vec![
                cand(&[1.0, 9.0]),
                cand(&[5.0, 5.0]),
                cand(&[9.0, 1.0]),
                cand(&[4.0, 4.0]),
                cand(&[8.0, 0.5]),
            ]],
            2,
            &[1.0, 1.0],
        );
        let front = &sets.unique_pareto_sols;
        for p in front {
            for q in front {
                if p.objectives != q.objectives {
                    assert!(!dominates(&q.objectives, &p.objectives));
                }
            }
        }
    }

    #[test]
    fn test_direction_restored_on_output() {
        // Normalized (maximize-all) values with a minimized first
        // objective: output flips its sign back.
        let sets = aggregate(
            vec![vec![cand(&[-3.0, 7.0]), cand(&[-5.0, 9.0])]],
            2,
            &[-1.0, 1.0],
        );
        assert_eq!(sets.unique_pareto_sols.len(), 2);
        let mut firsts: Vec<f64> = sets
            .unique_pareto_sols
            .iter()
            .map(|c| c.objectives[0])
            .collect();
        firsts.sort_by(f64::total_cmp);
        assert_eq!(firsts, vec![3.0, 5.0]);
    }

    #[test]
    fn test_later_batch_replaces_payload() {
        let mut first = cand(&[1.0, 2.0]);
        first.variables.insert("x".into(), 1.0);
        let mut second = cand(&[1.0, 2.0]);
        second.variables.insert("x".into(), 9.0);

        let sets = aggregate(vec![vec![first], vec![second]], 2, &[1.0, 1.0]);
        assert_eq!(sets.sols.len(), 1);
        assert_eq!(sets.sols[0].variables["x"], 9.0);
    }

    #[test]
    fn test_empty_input() {
        let sets = aggregate(vec![], 2, &[1.0, 1.0]);
        assert!(sets.sols.is_empty());
        assert!(sets.unique_sols.is_empty());
        assert!(sets.unique_pareto_sols.is_empty());
    }
}
