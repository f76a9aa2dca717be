//! Solution representation for a solved model.
//!
//! Holds the values of every decision variable together with the objective
//! value and the termination status. Formulations read it back through
//! [`VarId`] handles to build their domain-level plans.

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::model::{LinearExpr, VarId};
use crate::solver::{SolveOutcome, SolveStatus};

/// Values above this count as "on" for binary indicators.
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Represents a solution returned by a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Termination status (`Optimal`, or `TimeLimit` for an uncertified incumbent)
    pub status: SolveStatus,
    /// Objective value as reported by the backend
    pub objective: f64,
    /// One value per model variable
    pub values: Vec<f64>,
    /// Proven bound, if the backend reports one
    pub lower_bound: Option<f64>,
    /// Backend that produced this solution
    pub backend: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Branch-and-bound nodes (if reported)
    pub nodes_explored: Option<i64>,
}

impl Solution {
    /// Build a solution from a backend outcome that carries an incumbent.
    pub fn from_outcome(outcome: SolveOutcome, backend: &str) -> Result<Self> {
        let (Some(values), Some(objective)) = (outcome.values, outcome.objective) else {
            return Err(PlannerError::Backend(format!(
                "{} reported {} without variable values",
                backend, outcome.status
            )));
        };
        Ok(Solution {
            status: outcome.status,
            objective,
            values,
            lower_bound: outcome.lower_bound,
            backend: backend.to_string(),
            computation_time: outcome.computation_time,
            nodes_explored: outcome.nodes_explored,
        })
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }

    /// Binary indicator read with a 0.5 threshold
    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > BINARY_THRESHOLD
    }

    /// Integer variable rounded to the nearest whole number
    pub fn integer(&self, var: VarId) -> i64 {
        self.value(var).round() as i64
    }

    pub fn evaluate(&self, expr: &LinearExpr) -> f64 {
        expr.evaluate(&self.values)
    }

    /// False when the run stopped on a limit before proving optimality
    pub fn certified_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Relative gap between objective and bound, when a bound is known
    pub fn gap(&self) -> Option<f64> {
        self.lower_bound
            .map(|bound| (self.objective - bound).abs() / self.objective.abs().max(1e-10))
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.backend)?;
        writeln!(f, "  Status: {}", self.status)?;
        writeln!(f, "  Objective: {:.4}", self.objective)?;
        if let Some(gap) = self.gap() {
            writeln!(f, "  Gap: {:.4}%", gap * 100.0)?;
        }
        if let Some(nodes) = self.nodes_explored {
            writeln!(f, "  Nodes explored: {}", nodes)?;
        }
        write!(f, "  Time: {:.4}s", self.computation_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: SolveStatus, values: Option<Vec<f64>>) -> SolveOutcome {
        SolveOutcome {
            status,
            objective: values.as_ref().map(|v| v.iter().sum()),
            values,
            lower_bound: Some(1.5),
            nodes_explored: Some(7),
            computation_time: 0.25,
        }
    }

    #[test]
    fn test_solution_creation() {
        let sol = Solution::from_outcome(outcome(SolveStatus::Optimal, Some(vec![0.9999999, 1.0])), "test").unwrap();
        assert!(sol.certified_optimal());
        assert!((sol.objective - 1.9999999).abs() < 1e-12);
        assert!((sol.gap().unwrap() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_time_limited_incumbent_is_flagged() {
        let sol = Solution::from_outcome(outcome(SolveStatus::TimeLimit, Some(vec![1.0])), "test").unwrap();
        assert!(!sol.certified_optimal());
    }

    #[test]
    fn test_missing_values_rejected() {
        assert!(Solution::from_outcome(outcome(SolveStatus::Optimal, None), "test").is_err());
    }
}
