//! Hypervolume indicator.
//!
//! Measures the volume of objective space dominated by a solution set,
//! bounded by a reference point. Minimization convention: a point
//! contributes only if it is at or below the reference in every coordinate.
//!
//! Computed by slicing along the first objective and recursing on the
//! remaining dimensions. Exponential in the number of objectives in the
//! worst case, which is fine for the small fronts and low dimensions this
//! engine produces.
//!
//! # References
//!
//! - Zitzler & Thiele (1999), "Multiobjective Evolutionary Algorithms: A
//!   Comparative Case Study and the Strength Pareto Approach"
//! - While et al. (2006), "A Faster Algorithm for Calculating Hypervolume"

/// Hypervolume of `points` relative to `reference` (minimization).
///
/// Points with any coordinate above the reference are ignored. Returns 0.0
/// for an empty (or fully ignored) set.
pub fn hypervolume(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let contributing: Vec<Vec<f64>> = points
        .iter()
        .filter(|p| p.len() == reference.len() && p.iter().zip(reference).all(|(v, r)| v <= r))
        .cloned()
        .collect();
    if contributing.is_empty() {
        return 0.0;
    }
    slice_volume(contributing, reference)
}

fn slice_volume(mut points: Vec<Vec<f64>>, reference: &[f64]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    if reference.len() == 1 {
        let best = points
            .iter()
            .map(|p| p[0])
            .fold(f64::INFINITY, f64::min);
        return reference[0] - best;
    }

    points.sort_by(|a, b| a[0].total_cmp(&b[0]));

    // Sweep along dimension 0: each slice spans from one point's coordinate
    // to the next (or to the reference) and is filled by the projection of
    // every point at or below the slice start.
    let mut volume = 0.0;
    for i in 0..points.len() {
        let start = points[i][0];
        let end = if i + 1 < points.len() {
            points[i + 1][0]
        } else {
            reference[0]
        };
        let width = end - start;
        if width <= 0.0 {
            continue;
        }
        let projected: Vec<Vec<f64>> = points[..=i].iter().map(|p| p[1..].to_vec()).collect();
        volume += width * slice_volume(projected, &reference[1..]);
    }
    volume
}
