//! Pure-Rust backend built on the `microlp` branch-and-bound solver.
//!
//! `microlp` has no time, gap or thread limits, so those fields of
//! [`SolverConfig`] are ignored and the backend never reports `TimeLimit`.

use std::time::Instant;

use ::microlp::{ComparisonOp, OptimizationDirection, Problem};

use super::{SolveOutcome, SolveStatus, Solver, SolverConfig};
use crate::error::{PlannerError, Result};
use crate::model::{Model, Relation, Sense, VarDomain};

const CONSTANT_ROW_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
pub struct MicrolpSolver;

impl MicrolpSolver {
    pub fn new() -> Self {
        MicrolpSolver
    }
}

fn integer_bound(value: f64, name: &str) -> Result<i32> {
    if !value.is_finite() || value.abs() > i32::MAX as f64 {
        return Err(PlannerError::Backend(format!(
            "microlp needs finite i32 bounds on integer variable {}",
            name
        )));
    }
    Ok(value.round() as i32)
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<SolveOutcome> {
        let start = Instant::now();
        let direction = match model.sense() {
            Sense::Minimize => OptimizationDirection::Minimize,
            Sense::Maximize => OptimizationDirection::Maximize,
        };
        let mut problem = Problem::new(direction);

        let mut objective = vec![0.0; model.num_variables()];
        for &(var, coef) in model.objective().terms() {
            objective[var.index()] += coef;
        }

        let mut vars = Vec::with_capacity(model.num_variables());
        for (var, &weight) in model.variables().iter().zip(&objective) {
            let handle = match var.domain {
                VarDomain::Binary => problem.add_binary_var(weight),
                VarDomain::Integer => {
                    let lower = integer_bound(var.lower, &var.name)?;
                    let upper = integer_bound(var.upper, &var.name)?;
                    problem.add_integer_var(weight, (lower, upper))
                }
                VarDomain::Continuous => problem.add_var(weight, (var.lower, var.upper)),
            };
            vars.push(handle);
        }

        for (_, constraint) in model.constraints() {
            // Rows without terms are decided here; microlp expects at least one variable.
            if constraint.expr.is_empty() {
                if constraint.relation.holds(0.0, constraint.rhs, CONSTANT_ROW_TOLERANCE) {
                    continue;
                }
                log::debug!("Constant row {} can never hold", constraint.name);
                return Ok(SolveOutcome::without_incumbent(
                    SolveStatus::Infeasible,
                    start.elapsed().as_secs_f64(),
                ));
            }
            let op = match constraint.relation {
                Relation::Le => ComparisonOp::Le,
                Relation::Eq => ComparisonOp::Eq,
                Relation::Ge => ComparisonOp::Ge,
            };
            let terms: Vec<_> = constraint
                .expr
                .terms()
                .iter()
                .map(|&(var, coef)| (vars[var.index()], coef))
                .collect();
            problem.add_constraint(terms.into_iter(), op, constraint.rhs);
        }

        if config.verbose {
            log::debug!(
                "microlp problem for {}: {} variables, {} rows",
                model.name,
                model.num_variables(),
                model.num_constraints()
            );
        }

        let elapsed = |start: Instant| start.elapsed().as_secs_f64();
        match problem.solve() {
            Ok(solution) => {
                let values: Vec<f64> = solution.iter().map(|(_, v)| *v).collect();
                Ok(SolveOutcome {
                    status: SolveStatus::Optimal,
                    objective: Some(solution.objective() + model.objective().constant_term()),
                    lower_bound: None,
                    nodes_explored: None,
                    values: Some(values),
                    computation_time: elapsed(start),
                })
            }
            Err(::microlp::Error::Infeasible) => {
                Ok(SolveOutcome::without_incumbent(SolveStatus::Infeasible, elapsed(start)))
            }
            Err(::microlp::Error::Unbounded) => {
                Ok(SolveOutcome::without_incumbent(SolveStatus::Unbounded, elapsed(start)))
            }
            #[allow(unreachable_patterns)]
            Err(e) => Err(PlannerError::Backend(format!("microlp failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearExpr;

    #[test]
    fn test_small_milp() {
        // max x + 2y s.t. x + y <= 3.5, y <= 2.5, y integer
        let mut model = Model::new("small");
        let x = model.declare_variable("x", VarDomain::Continuous, 0.0, 10.0).unwrap();
        let y = model.declare_variable("y", VarDomain::Integer, 0.0, 10.0).unwrap();
        model.set_objective(LinearExpr::from_terms(vec![(x, 1.0), (y, 2.0)]), Sense::Maximize).unwrap();
        model.add_constraint("sum", LinearExpr::sum(vec![x, y]), Relation::Le, 3.5).unwrap();
        model.add_constraint("y_cap", y.into(), Relation::Le, 2.5).unwrap();

        let outcome = MicrolpSolver::new().solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        let values = outcome.values.unwrap();
        assert!((values[y.index()] - 2.0).abs() < 1e-6);
        assert!((values[x.index()] - 1.5).abs() < 1e-6);
        assert!((outcome.objective.unwrap() - 5.5).abs() < 1e-6);
    }

    #[test]
    fn test_objective_constant_is_added() {
        let mut model = Model::new("constant");
        let x = model.binary("x").unwrap();
        let mut objective = LinearExpr::from(x);
        objective.add_constant(10.0);
        model.set_objective(objective, Sense::Minimize).unwrap();
        let outcome = MicrolpSolver::new().solve(&model, &SolverConfig::default()).unwrap();
        assert!((outcome.objective.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_infeasible_status() {
        let mut model = Model::new("infeasible");
        let x = model.binary("x").unwrap();
        model.add_constraint("ge", x.into(), Relation::Ge, 2.0).unwrap();
        let outcome = MicrolpSolver::new().solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(outcome.values.is_none());
    }

    #[test]
    fn test_empty_row_decided_up_front() {
        let mut model = Model::new("empty_row");
        model.binary("x").unwrap();
        model.add_constraint("never", LinearExpr::new(), Relation::Ge, 1.0).unwrap();
        let outcome = MicrolpSolver::new().solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible);
    }

    #[test]
    fn test_unbounded_status() {
        let mut model = Model::new("unbounded");
        let x = model.declare_variable("x", VarDomain::Continuous, 0.0, f64::INFINITY).unwrap();
        model.set_objective(x.into(), Sense::Maximize).unwrap();
        model.add_constraint("ge", x.into(), Relation::Ge, 1.0).unwrap();
        let outcome = MicrolpSolver::new().solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Unbounded);
    }
}
