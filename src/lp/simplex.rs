//! Dense two-phase simplex solver.
//!
//! [`SimplexSolver`] implements
//! [`ObjectiveSolver`](crate::ObjectiveSolver) on top of an
//! [`LpModel`]. Every solve assembles a fresh tableau from the model plus
//! the current engine state (active objective, pins, slack structure), so
//! there is no hidden mutable solver state to corrupt between solves.
//!
//! Bland's rule is used for both pivot choices, which rules out cycling on
//! degenerate vertices at the cost of a few extra pivots.

use std::collections::BTreeMap;

use crate::types::{ObjectiveSense, ObjectiveSolver, SolveStatus};

use super::model::{Cmp, LpModel};

const PIVOT_TOL: f64 = 1e-9;

/// Epsilon-constraint structure installed by the engine.
#[derive(Debug, Clone)]
struct SlackStructure {
    eps: f64,
    obj_range: Vec<f64>,
    rhs: Vec<f64>,
}

/// Decision-variable and slack values of the last optimal solve.
#[derive(Debug, Clone)]
struct SolvedPoint {
    vars: Vec<f64>,
    slacks: Vec<f64>,
}

/// Simplex-backed implementation of the engine's solver interface.
#[derive(Debug, Clone)]
pub struct SimplexSolver {
    model: LpModel,
    /// Per-objective sign; -1 after a negation.
    sign: Vec<f64>,
    active: Vec<bool>,
    pinned: Vec<(usize, f64)>,
    slack: Option<SlackStructure>,
    solution: Option<SolvedPoint>,
}

impl SimplexSolver {
    /// Wraps a model. All objectives start deactivated.
    pub fn new(model: LpModel) -> Self {
        let n_obj = model.objectives().len();
        Self {
            model,
            sign: vec![1.0; n_obj],
            active: vec![false; n_obj],
            pinned: Vec::new(),
            slack: None,
            solution: None,
        }
    }

    fn n_slack_vars(&self) -> usize {
        self.slack.as_ref().map_or(0, |s| s.rhs.len())
    }

    /// Coefficients of objective `i`'s current expression over the solve
    /// columns (structural variables then slack variables). Objective 0
    /// carries the penalty terms once the slack structure is installed.
    fn effective_columns(&self, i: usize) -> Vec<f64> {
        let n_struct = self.model.variables().len();
        let mut cols = vec![0.0; n_struct + self.n_slack_vars()];
        for &(v, coeff) in &self.model.objectives()[i].terms {
            cols[v] += self.sign[i] * coeff;
        }
        if i == 0 {
            if let Some(slack) = &self.slack {
                for (o, &range) in slack.obj_range.iter().enumerate() {
                    if range > 0.0 {
                        cols[n_struct + o] += slack.eps * 10f64.powi(-(o as i32)) / range;
                    }
                }
            }
        }
        cols
    }

    /// Current sense of objective `i` (original sense, flipped by
    /// negation).
    fn current_sense(&self, i: usize) -> ObjectiveSense {
        let original = self.model.objectives()[i].sense;
        if self.sign[i] < 0.0 {
            match original {
                ObjectiveSense::Minimize => ObjectiveSense::Maximize,
                ObjectiveSense::Maximize => ObjectiveSense::Minimize,
            }
        } else {
            original
        }
    }

    /// Assembles the constraint rows over the shifted variables
    /// `y = x - lower` (and the slack variables, which have lower bound 0).
    fn assemble_rows(&self) -> Vec<Row> {
        let n_struct = self.model.variables().len();
        let n_cols = n_struct + self.n_slack_vars();
        let lower: Vec<f64> = self.model.variables().iter().map(|v| v.lower).collect();
        let mut rows = Vec::new();

        let shift = |terms: &[f64]| -> f64 {
            terms
                .iter()
                .take(n_struct)
                .zip(&lower)
                .map(|(c, l)| c * l)
                .sum()
        };

        for constraint in self.model.constraints() {
            let mut coeffs = vec![0.0; n_cols];
            for &(v, c) in &constraint.terms {
                coeffs[v] += c;
            }
            let rhs = constraint.rhs - shift(&coeffs);
            rows.push(Row {
                coeffs,
                cmp: constraint.cmp,
                rhs,
            });
        }

        for (v, var) in self.model.variables().iter().enumerate() {
            if let Some(upper) = var.upper {
                let mut coeffs = vec![0.0; n_cols];
                coeffs[v] = 1.0;
                rows.push(Row {
                    coeffs,
                    cmp: Cmp::Le,
                    rhs: upper - var.lower,
                });
            }
        }

        for &(i, value) in &self.pinned {
            let coeffs = self.effective_objective_terms(i, n_cols);
            let rhs = value - shift(&coeffs);
            rows.push(Row {
                coeffs,
                cmp: Cmp::Eq,
                rhs,
            });
        }

        if let Some(slack) = &self.slack {
            for (o, &rhs) in slack.rhs.iter().enumerate() {
                let mut coeffs = self.effective_objective_terms(o + 1, n_cols);
                coeffs[n_struct + o] = -1.0;
                let rhs = rhs - shift(&coeffs);
                rows.push(Row {
                    coeffs,
                    cmp: Cmp::Eq,
                    rhs,
                });
            }
        }

        rows
    }

    /// Objective `i`'s expression without penalty terms, as solve columns.
    fn effective_objective_terms(&self, i: usize, n_cols: usize) -> Vec<f64> {
        let mut cols = vec![0.0; n_cols];
        for &(v, coeff) in &self.model.objectives()[i].terms {
            cols[v] += self.sign[i] * coeff;
        }
        cols
    }
}

impl ObjectiveSolver for SimplexSolver {
    fn objective_count(&self) -> usize {
        self.model.objectives().len()
    }

    fn objective_sense(&self, i: usize) -> ObjectiveSense {
        self.current_sense(i)
    }

    fn negate_objective(&mut self, i: usize) {
        self.sign[i] = -self.sign[i];
    }

    fn activate_objective(&mut self, i: usize) {
        self.active[i] = true;
    }

    fn deactivate_objective(&mut self, i: usize) {
        self.active[i] = false;
    }

    fn pin_objective(&mut self, i: usize, value: f64) {
        self.pinned.push((i, value));
    }

    fn clear_pinned_objectives(&mut self) {
        self.pinned.clear();
    }

    fn install_slack_constraints(&mut self, eps: f64, obj_range: &[f64]) {
        self.slack = Some(SlackStructure {
            eps,
            obj_range: obj_range.to_vec(),
            rhs: vec![f64::NAN; obj_range.len()],
        });
    }

    fn set_constraint_rhs(&mut self, o: usize, value: f64) {
        if let Some(slack) = &mut self.slack {
            slack.rhs[o] = value;
        }
    }

    fn solve(&mut self) -> SolveStatus {
        self.solution = None;
        let Some(primary) = (0..self.active.len()).find(|&i| self.active[i]) else {
            return SolveStatus::Other;
        };

        // Sum of the active expressions, converted to maximize form.
        let n_struct = self.model.variables().len();
        let n_cols = n_struct + self.n_slack_vars();
        let mut objective = vec![0.0; n_cols];
        for i in 0..self.active.len() {
            if self.active[i] {
                for (col, c) in objective.iter_mut().zip(self.effective_columns(i)) {
                    *col += c;
                }
            }
        }
        if self.current_sense(primary) == ObjectiveSense::Minimize {
            for c in &mut objective {
                *c = -*c;
            }
        }

        let rows = self.assemble_rows();
        match simplex_maximize(n_cols, &rows, &objective) {
            SimplexOutcome::Optimal(y) => {
                let lower: Vec<f64> = self.model.variables().iter().map(|v| v.lower).collect();
                let vars: Vec<f64> = y[..n_struct]
                    .iter()
                    .zip(&lower)
                    .map(|(v, l)| v + l)
                    .collect();
                let slacks = y[n_struct..].to_vec();
                self.solution = Some(SolvedPoint { vars, slacks });
                SolveStatus::Optimal
            }
            SimplexOutcome::Infeasible => SolveStatus::Infeasible,
            SimplexOutcome::Unbounded => SolveStatus::Other,
        }
    }

    fn objective_value(&self, i: usize) -> f64 {
        let Some(solution) = &self.solution else {
            return f64::NAN;
        };
        let n_struct = self.model.variables().len();
        let cols = self.effective_columns(i);
        let mut value = 0.0;
        for (v, &c) in cols.iter().take(n_struct).enumerate() {
            value += c * solution.vars[v];
        }
        for (o, &c) in cols[n_struct..].iter().enumerate() {
            value += c * solution.slacks[o];
        }
        value
    }

    fn slack_value(&self, o: usize) -> f64 {
        self.solution
            .as_ref()
            .map_or(f64::NAN, |s| s.slacks[o])
    }

    fn variable_values(&self) -> BTreeMap<String, f64> {
        let Some(solution) = &self.solution else {
            return BTreeMap::new();
        };
        self.model
            .variables()
            .iter()
            .zip(&solution.vars)
            .map(|(var, &value)| (var.name.clone(), value))
            .collect()
    }

    fn fork(&self) -> Box<dyn ObjectiveSolver> {
        Box::new(self.clone())
    }
}

/// One assembled constraint row over the solve columns.
#[derive(Debug, Clone)]
struct Row {
    coeffs: Vec<f64>,
    cmp: Cmp,
    rhs: f64,
}

enum SimplexOutcome {
    Optimal(Vec<f64>),
    Infeasible,
    Unbounded,
}

/// Maximizes `objective . y` subject to `rows` and `y >= 0`.
fn simplex_maximize(n: usize, rows: &[Row], objective: &[f64]) -> SimplexOutcome {
    // Normalize every row to a nonnegative right-hand side.
    let mut norm: Vec<Row> = rows.to_vec();
    for row in &mut norm {
        if row.rhs < 0.0 {
            for c in &mut row.coeffs {
                *c = -*c;
            }
            row.rhs = -row.rhs;
            row.cmp = match row.cmp {
                Cmp::Le => Cmp::Ge,
                Cmp::Ge => Cmp::Le,
                Cmp::Eq => Cmp::Eq,
            };
        }
    }

    // Column layout: structural, then one slack/surplus per inequality,
    // then one artificial per Ge/Eq row.
    let m = norm.len();
    let n_ineq = norm.iter().filter(|r| r.cmp != Cmp::Eq).count();
    let art_start = n + n_ineq;
    let n_art = norm.iter().filter(|r| r.cmp != Cmp::Le).count();
    let cols = art_start + n_art;

    let mut tableau: Vec<Vec<f64>> = Vec::with_capacity(m);
    let mut basis: Vec<usize> = Vec::with_capacity(m);
    let mut next_ineq = n;
    let mut next_art = art_start;
    for row in &norm {
        let mut t = vec![0.0; cols + 1];
        t[..n].copy_from_slice(&row.coeffs);
        t[cols] = row.rhs;
        match row.cmp {
            Cmp::Le => {
                t[next_ineq] = 1.0;
                basis.push(next_ineq);
                next_ineq += 1;
            }
            Cmp::Ge => {
                t[next_ineq] = -1.0;
                next_ineq += 1;
                t[next_art] = 1.0;
                basis.push(next_art);
                next_art += 1;
            }
            Cmp::Eq => {
                t[next_art] = 1.0;
                basis.push(next_art);
                next_art += 1;
            }
        }
        tableau.push(t);
    }

    // Phase 1: minimize the artificial sum to find a feasible basis.
    if n_art > 0 {
        let mut costs = vec![0.0; cols];
        for c in &mut costs[art_start..] {
            *c = 1.0;
        }
        if pivot_until_optimal(&mut tableau, &mut basis, &costs, cols).is_err() {
            // The artificial sum is bounded below by zero; unbounded here
            // means numerical trouble, so report infeasible.
            return SimplexOutcome::Infeasible;
        }

        let residual: f64 = basis
            .iter()
            .zip(&tableau)
            .filter(|(&b, _)| b >= art_start)
            .map(|(_, row)| row[cols])
            .sum();
        let scale = norm.iter().map(|r| r.rhs.abs()).fold(1.0, f64::max);
        if residual > 1e-6 * scale {
            return SimplexOutcome::Infeasible;
        }

        // Drive leftover artificials out of the basis; rows that offer no
        // pivot are redundant and dropped.
        let mut i = 0;
        while i < tableau.len() {
            if basis[i] >= art_start {
                match (0..art_start).find(|&j| tableau[i][j].abs() > PIVOT_TOL) {
                    Some(j) => {
                        pivot(&mut tableau, &mut basis, i, j);
                        i += 1;
                    }
                    None => {
                        tableau.remove(i);
                        basis.remove(i);
                    }
                }
            } else {
                i += 1;
            }
        }
    }

    // Phase 2: minimize the negated objective with artificials barred from
    // entering.
    let mut costs = vec![0.0; cols];
    for (c, &o) in costs.iter_mut().zip(objective) {
        *c = -o;
    }
    if pivot_until_optimal(&mut tableau, &mut basis, &costs, art_start).is_err() {
        return SimplexOutcome::Unbounded;
    }

    let mut y = vec![0.0; n];
    let rhs_col = cols;
    for (i, &b) in basis.iter().enumerate() {
        if b < n {
            y[b] = tableau[i][rhs_col];
        }
    }
    SimplexOutcome::Optimal(y)
}

struct Unbounded;

/// Minimizes `costs . y` over the current tableau with Bland's rule.
/// Columns at or beyond `allowed` never enter the basis.
fn pivot_until_optimal(
    tableau: &mut Vec<Vec<f64>>,
    basis: &mut [usize],
    costs: &[f64],
    allowed: usize,
) -> Result<(), Unbounded> {
    let cols = costs.len();
    loop {
        // Reduced costs from scratch: the tableau stays canonical, so
        // r_j = c_j - sum_i c_B(i) * t(i, j).
        let entering = (0..allowed).find(|&j| {
            let mut r = costs[j];
            for (i, row) in tableau.iter().enumerate() {
                let cb = costs[basis[i]];
                if cb != 0.0 {
                    r -= cb * row[j];
                }
            }
            r < -PIVOT_TOL
        });
        let Some(enter) = entering else {
            return Ok(());
        };

        let mut leave: Option<(usize, f64)> = None;
        for (i, row) in tableau.iter().enumerate() {
            if row[enter] > PIVOT_TOL {
                let ratio = row[cols] / row[enter];
                let better = match leave {
                    None => true,
                    Some((best_i, best_ratio)) => {
                        ratio < best_ratio - PIVOT_TOL
                            || (ratio <= best_ratio + PIVOT_TOL && basis[i] < basis[best_i])
                    }
                };
                if better {
                    leave = Some((i, ratio));
                }
            }
        }
        let Some((leave, _)) = leave else {
            return Err(Unbounded);
        };

        pivot(tableau, basis, leave, enter);
    }
}

/// Pivots the tableau on `(row, col)`.
fn pivot(tableau: &mut [Vec<f64>], basis: &mut [usize], row: usize, col: usize) {
    let factor = tableau[row][col];
    for v in tableau[row].iter_mut() {
        *v /= factor;
    }
    let pivot_row = tableau[row].clone();
    for (i, target) in tableau.iter_mut().enumerate() {
        if i == row {
            continue;
        }
        let multiple = target[col];
        if multiple == 0.0 {
            continue;
        }
        for (t, p) in target.iter_mut().zip(&pivot_row) {
            *t -= multiple * p;
        }
        // Keep the pivot column numerically exact.
        target[col] = 0.0;
    }
    basis[row] = col;
}
