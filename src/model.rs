//! Solver-neutral representation of a mixed-integer linear program.
//!
//! A [`Model`] holds variable declarations, one linear objective and a set of
//! named linear constraints. Backends in [`crate::solver`] consume it as-is;
//! nothing here knows about a particular solver.
//!
//! Constraints can be removed again, which the epsilon-constraint sweep uses
//! to attach a temporary bound and discard it after each re-solve. Removed
//! constraints leave a hole so that [`ConstraintId`]s stay stable.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// Handle of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle of an added constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(usize);

impl ConstraintId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Domain of a decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarDomain {
    Binary,
    Integer,
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Le,
    Eq,
    Ge,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Le => "<=",
            Relation::Eq => "=",
            Relation::Ge => ">=",
        }
    }

    /// Check `lhs (relation) rhs` with an absolute tolerance.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Relation::Le => lhs <= rhs + tolerance,
            Relation::Eq => (lhs - rhs).abs() <= tolerance,
            Relation::Ge => lhs >= rhs - tolerance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// A declared decision variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub domain: VarDomain,
    pub lower: f64,
    pub upper: f64,
}

/// Linear expression `sum(coef * var) + constant`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        LinearExpr { terms: Vec::new(), constant: value }
    }

    /// Sum of the given variables, each with coefficient 1.
    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        LinearExpr { terms: vars.into_iter().map(|v| (v, 1.0)).collect(), constant: 0.0 }
    }

    pub fn from_terms<I: IntoIterator<Item = (VarId, f64)>>(terms: I) -> Self {
        LinearExpr { terms: terms.into_iter().collect(), constant: 0.0 }
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) -> &mut Self {
        self.terms.push((var, coefficient));
        self
    }

    pub fn add_constant(&mut self, value: f64) -> &mut Self {
        self.constant += value;
        self
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Merge duplicate variables and drop zero coefficients.
    pub fn normalized(&self) -> Self {
        let mut terms = self.terms.clone();
        terms.sort_by_key(|&(v, _)| v);
        let mut merged: Vec<(VarId, f64)> = Vec::with_capacity(terms.len());
        for (var, coef) in terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == var => *acc += coef,
                _ => merged.push((var, coef)),
            }
        }
        merged.retain(|&(_, c)| c != 0.0);
        LinearExpr { terms: merged, constant: self.constant }
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.constant + self.terms.iter().map(|&(v, c)| c * values[v.0]).sum::<f64>()
    }

    pub fn is_finite(&self) -> bool {
        self.constant.is_finite() && self.terms.iter().all(|&(_, c)| c.is_finite())
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr { terms: vec![(var, 1.0)], constant: 0.0 }
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: LinearExpr) -> LinearExpr {
        self.terms.extend(rhs.terms.into_iter().map(|(v, c)| (v, -c)));
        self.constant -= rhs.constant;
        self
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, factor: f64) -> LinearExpr {
        for (_, c) in &mut self.terms {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }
}

impl Mul<f64> for VarId {
    type Output = LinearExpr;

    fn mul(self, factor: f64) -> LinearExpr {
        LinearExpr { terms: vec![(self, factor)], constant: 0.0 }
    }
}

/// A named linear constraint `expr (relation) rhs`; the expression carries no constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        self.relation.holds(self.expr.evaluate(values), self.rhs, tolerance)
    }
}

/// A complete MILP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    variables: Vec<Variable>,
    objective: LinearExpr,
    sense: Sense,
    constraints: Vec<Option<Constraint>>,
}

impl Model {
    pub fn new(name: &str) -> Self {
        Model {
            name: name.to_string(),
            variables: Vec::new(),
            objective: LinearExpr::new(),
            sense: Sense::Minimize,
            constraints: Vec::new(),
        }
    }

    /// Declare a variable. Binary variables always get the bounds [0, 1].
    pub fn declare_variable(&mut self, name: &str, domain: VarDomain, lower: f64, upper: f64) -> Result<VarId> {
        let (lower, upper) = match domain {
            VarDomain::Binary => (0.0, 1.0),
            _ => (lower, upper),
        };
        if lower.is_nan() || upper.is_nan() {
            return Err(PlannerError::NonFinite { context: format!("bounds of variable {}", name) });
        }
        if lower > upper {
            return Err(PlannerError::InvalidParameter(format!(
                "variable {} has lower bound {} above upper bound {}",
                name, lower, upper
            )));
        }
        self.variables.push(Variable { name: name.to_string(), domain, lower, upper });
        Ok(VarId(self.variables.len() - 1))
    }

    pub fn binary(&mut self, name: &str) -> Result<VarId> {
        self.declare_variable(name, VarDomain::Binary, 0.0, 1.0)
    }

    pub fn set_objective(&mut self, objective: LinearExpr, sense: Sense) -> Result<()> {
        self.check_expr(&objective, "objective")?;
        self.objective = objective.normalized();
        self.sense = sense;
        Ok(())
    }

    /// Add `expr (relation) rhs`. The constant of `expr` is moved to the right-hand side.
    pub fn add_constraint(&mut self, name: &str, expr: LinearExpr, relation: Relation, rhs: f64) -> Result<ConstraintId> {
        self.check_expr(&expr, name)?;
        if !rhs.is_finite() {
            return Err(PlannerError::NonFinite { context: format!("right-hand side of {}", name) });
        }
        let mut expr = expr.normalized();
        let rhs = rhs - expr.constant;
        expr.constant = 0.0;
        self.constraints.push(Some(Constraint { name: name.to_string(), expr, relation, rhs }));
        Ok(ConstraintId(self.constraints.len() - 1))
    }

    /// Remove a constraint, returning it if it was still present.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Option<Constraint> {
        self.constraints.get_mut(id.0).and_then(Option::take)
    }

    fn check_expr(&self, expr: &LinearExpr, context: &str) -> Result<()> {
        if !expr.is_finite() {
            return Err(PlannerError::NonFinite { context: context.to_string() });
        }
        if let Some(&(v, _)) = expr.terms.iter().find(|&&(v, _)| v.0 >= self.variables.len()) {
            return Err(PlannerError::InvalidParameter(format!(
                "{} references undeclared variable #{}",
                context, v.0
            )));
        }
        Ok(())
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Active constraints with their handles, in insertion order.
    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintId, &Constraint)> {
        self.constraints
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (ConstraintId(i), c)))
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.get(id.0).and_then(Option::as_ref)
    }

    pub fn constraint_ids(&self) -> Vec<ConstraintId> {
        self.constraints().map(|(id, _)| id).collect()
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.iter().filter(|c| c.is_some()).count()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.domain != VarDomain::Continuous).count()
    }

    /// Copy of this model keeping only the listed constraints (handles are preserved).
    pub fn restricted_to(&self, keep: &[ConstraintId]) -> Model {
        let mut constraints = vec![None; self.constraints.len()];
        for id in keep {
            if let Some(c) = self.constraint(*id) {
                constraints[id.0] = Some(c.clone());
            }
        }
        Model {
            name: self.name.clone(),
            variables: self.variables.clone(),
            objective: self.objective.clone(),
            sense: self.sense,
            constraints,
        }
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.evaluate(values)
    }

    /// Constraints and variable bounds/domains violated by `values`.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<String> {
        let mut violated = Vec::new();
        for (var, &value) in self.variables.iter().zip(values) {
            if value < var.lower - tolerance || value > var.upper + tolerance {
                violated.push(format!("bounds of {}", var.name));
            }
            if var.domain != VarDomain::Continuous && (value - value.round()).abs() > tolerance {
                violated.push(format!("integrality of {}", var.name));
            }
        }
        for (_, c) in self.constraints() {
            if !c.is_satisfied(values, tolerance) {
                violated.push(c.name.clone());
            }
        }
        violated
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: {}", self.name)?;
        writeln!(
            f,
            "  Variables: {} ({} integer/binary)",
            self.num_variables(),
            self.num_integer_variables()
        )?;
        write!(f, "  Constraints: {}", self.num_constraints())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_moves_to_rhs() {
        let mut model = Model::new("t");
        let x = model.declare_variable("x", VarDomain::Continuous, 0.0, 10.0).unwrap();
        let expr = LinearExpr::from(x) + LinearExpr::constant(3.0);
        let id = model.add_constraint("c", expr, Relation::Le, 5.0).unwrap();
        let c = model.constraint(id).unwrap();
        assert_eq!(c.rhs, 2.0);
        assert_eq!(c.expr.constant_term(), 0.0);
    }

    #[test]
    fn test_normalized_merges_duplicates() {
        let mut model = Model::new("t");
        let x = model.binary("x").unwrap();
        let y = model.binary("y").unwrap();
        let expr = LinearExpr::from_terms(vec![(x, 1.0), (y, 2.0), (x, -1.0), (y, 1.0)]).normalized();
        assert_eq!(expr.terms(), &[(y, 3.0)]);
    }

    #[test]
    fn test_non_finite_coefficient_rejected() {
        let mut model = Model::new("t");
        let x = model.binary("x").unwrap();
        let err = model.add_constraint("bad", x * f64::NAN, Relation::Ge, 0.0).unwrap_err();
        assert!(matches!(err, PlannerError::NonFinite { .. }));
        let err = model.add_constraint("bad_rhs", x * 1.0, Relation::Ge, f64::INFINITY).unwrap_err();
        assert!(matches!(err, PlannerError::NonFinite { .. }));
    }

    #[test]
    fn test_remove_keeps_handles_stable() {
        let mut model = Model::new("t");
        let x = model.binary("x").unwrap();
        let a = model.add_constraint("a", x.into(), Relation::Le, 1.0).unwrap();
        let b = model.add_constraint("b", x.into(), Relation::Ge, 0.0).unwrap();
        assert!(model.remove_constraint(a).is_some());
        assert!(model.remove_constraint(a).is_none());
        assert_eq!(model.num_constraints(), 1);
        assert_eq!(model.constraint(b).unwrap().name, "b");
        assert_eq!(model.constraint_ids(), vec![b]);
    }

    #[test]
    fn test_violations_report_bounds_and_rows() {
        let mut model = Model::new("t");
        let x = model.declare_variable("x", VarDomain::Integer, 0.0, 3.0).unwrap();
        model.add_constraint("cap", x.into(), Relation::Le, 2.0).unwrap();
        assert!(model.violations(&[2.0], 1e-9).is_empty());
        let violated = model.violations(&[2.5], 1e-9);
        assert!(violated.contains(&"integrality of x".to_string()));
        assert!(violated.contains(&"cap".to_string()));
    }
}
