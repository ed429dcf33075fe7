//! Grid coordinate enumeration.
//!
//! The search space is the Cartesian grid of constraint-level indices, one
//! axis per constrained objective. The traversal order is load-bearing:
//! axis 0 must vary fastest, because the skip/jump logic only advances
//! along axis 0 within a "row" of `gp` consecutive points.

/// One point of the search grid: `(n_obj - 1)` level indices.
pub type GridCoord = Vec<usize>;

/// Enumerates the full grid in traversal order.
///
/// Produces `gp^(n_obj - 1)` coordinates. Axis 0 varies fastest and the
/// last axis slowest, so every run of `gp` consecutive coordinates is one
/// row with all axes but axis 0 fixed. With `minimize` set, each axis is
/// walked from `gp - 1` down to 0 instead.
///
/// The sequence is materialized eagerly: the partitioner needs random
/// access, and the whole order is recomputable from the arguments alone.
///
/// # Panics
///
/// Panics if `n_obj < 2` (the engine validates this earlier).
pub fn enumerate_grid(gp: usize, n_obj: usize, minimize: bool) -> Vec<GridCoord> {
    assert!(n_obj >= 2, "grid requires at least 2 objectives");
    let axes = n_obj - 1;
    let total = gp.pow(axes as u32);

    let mut coords = Vec::with_capacity(total);
    for t in 0..total {
        let mut c = Vec::with_capacity(axes);
        let mut rest = t;
        for _ in 0..axes {
            let idx = rest % gp;
            rest /= gp;
            c.push(if minimize { gp - 1 - idx } else { idx });
        }
        coords.push(c);
    }
    coords
}
