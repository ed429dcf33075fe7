//! LP modeling layer.
//!
//! A small, self-contained model of a continuous linear program: bounded
//! nonnegative-style variables, linear constraints, and a list of linear
//! objectives of which one is optimized at a time. Integer variables are
//! out of scope; plug a MIP-capable backend into
//! [`ObjectiveSolver`](crate::ObjectiveSolver) for those.

use crate::types::ObjectiveSense;

/// Constraint comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    /// Left-hand side <= right-hand side.
    Le,
    /// Left-hand side >= right-hand side.
    Ge,
    /// Left-hand side == right-hand side.
    Eq,
}

/// A continuous decision variable.
#[derive(Debug, Clone)]
pub struct LpVariable {
    /// Variable name, used in solution snapshots.
    pub name: String,
    /// Lower bound (finite).
    pub lower: f64,
    /// Optional upper bound.
    pub upper: Option<f64>,
}

/// A linear constraint `sum(coeff * var) cmp rhs`.
#[derive(Debug, Clone)]
pub struct LpConstraint {
    /// Sparse terms as `(variable index, coefficient)`.
    pub terms: Vec<(usize, f64)>,
    /// Comparison operator.
    pub cmp: Cmp,
    /// Right-hand side.
    pub rhs: f64,
}

/// A linear objective `sum(coeff * var)` with a direction.
#[derive(Debug, Clone)]
pub struct LpObjective {
    /// Sparse terms as `(variable index, coefficient)`.
    pub terms: Vec<(usize, f64)>,
    /// Optimization direction.
    pub sense: ObjectiveSense,
}

/// A multi-objective linear program.
///
/// # Usage
///
/// ```
/// use augmecon::ObjectiveSense;
/// use augmecon::lp::{Cmp, LpModel};
///
/// let mut model = LpModel::new();
/// let x1 = model.add_var("x1", 0.0);
/// let x2 = model.add_var("x2", 0.0);
/// model.add_constraint(&[(x1, 5.0), (x2, 4.0)], Cmp::Le, 200.0);
/// model.add_objective(&[(x1, 1.0)], ObjectiveSense::Maximize);
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LpModel {
    variables: Vec<LpVariable>,
    constraints: Vec<LpConstraint>,
    objectives: Vec<LpObjective>,
}

impl LpModel {
    /// An empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable with a lower bound and no upper bound; returns its
    /// index.
    pub fn add_var(&mut self, name: &str, lower: f64) -> usize {
        self.variables.push(LpVariable {
            name: name.to_string(),
            lower,
            upper: None,
        });
        self.variables.len() - 1
    }

    /// Adds a variable with both bounds; returns its index.
    pub fn add_var_bounded(&mut self, name: &str, lower: f64, upper: f64) -> usize {
        self.variables.push(LpVariable {
            name: name.to_string(),
            lower,
            upper: Some(upper),
        });
        self.variables.len() - 1
    }

    /// Adds a linear constraint.
    pub fn add_constraint(&mut self, terms: &[(usize, f64)], cmp: Cmp, rhs: f64) {
        self.constraints.push(LpConstraint {
            terms: terms.to_vec(),
            cmp,
            rhs,
        });
    }

    /// Adds an objective; returns its index.
    pub fn add_objective(&mut self, terms: &[(usize, f64)], sense: ObjectiveSense) -> usize {
        self.objectives.push(LpObjective {
            terms: terms.to_vec(),
            sense,
        });
        self.objectives.len() - 1
    }

    /// The variables.
    pub fn variables(&self) -> &[LpVariable] {
        &self.variables
    }

    /// The constraints.
    pub fn constraints(&self) -> &[LpConstraint] {
        &self.constraints
    }

    /// The objectives.
    pub fn objectives(&self) -> &[LpObjective] {
        &self.objectives
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.objectives.is_empty() {
            return Err("model has no objectives".into());
        }
        for (i, v) in self.variables.iter().enumerate() {
            if !v.lower.is_finite() {
                return Err(format!("variable {i} ({}) has a non-finite lower bound", v.name));
            }
            if let Some(upper) = v.upper {
                if upper < v.lower {
                    return Err(format!(
                        "variable {i} ({}) has upper bound {} below lower bound {}",
                        v.name, upper, v.lower
                    ));
                }
            }
        }
        let n = self.variables.len();
        for (i, c) in self.constraints.iter().enumerate() {
            if c.terms.iter().any(|&(v, _)| v >= n) {
                return Err(format!("constraint {i} references an unknown variable"));
            }
        }
        for (i, o) in self.objectives.iter().enumerate() {
            if o.terms.iter().any(|&(v, _)| v >= n) {
                return Err(format!("objective {i} references an unknown variable"));
            }
        }
        Ok(())
    }
}
