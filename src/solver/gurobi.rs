//! Backend using the Gurobi optimizer through the `grb` crate.
//!
//! Unlike the pure-Rust backend, Gurobi honours the time limit, MIP gap and
//! thread settings, and computes the irreducible inconsistent subsystem
//! natively.

use std::time::Instant;

use grb::expr::LinExpr;
use grb::prelude::*;

use super::{SolveOutcome, SolveStatus, Solver, SolverConfig};
use crate::error::{PlannerError, Result};
use crate::model::{ConstraintId, Model, Relation, Sense, VarDomain};

fn backend_err(context: &str) -> impl Fn(grb::Error) -> PlannerError + '_ {
    move |e| PlannerError::Backend(format!("{}: {}", context, e))
}

/// Gurobi-based solver
#[derive(Debug, Clone, Default)]
pub struct GurobiSolver;

/// A Gurobi model mirroring a [`Model`], with handles in the same order.
struct Translated {
    grb_model: grb::Model,
    vars: Vec<Var>,
    constrs: Vec<(ConstraintId, Constr)>,
}

impl GurobiSolver {
    pub fn new() -> Self {
        GurobiSolver
    }

    fn translate(&self, model: &Model, config: &SolverConfig) -> Result<Translated> {
        let env = Env::new("").map_err(backend_err("Failed to create Gurobi environment"))?;
        let mut grb_model = grb::Model::with_env(&model.name, env).map_err(backend_err("Failed to create model"))?;

        grb_model.set_param(param::TimeLimit, config.time_limit).map_err(backend_err("Failed to set time limit"))?;
        grb_model.set_param(param::MIPGap, config.mip_gap).map_err(backend_err("Failed to set MIP gap"))?;
        grb_model.set_param(param::Threads, config.threads).map_err(backend_err("Failed to set threads"))?;
        if !config.verbose {
            grb_model.set_param(param::OutputFlag, 0).map_err(backend_err("Failed to set output flag"))?;
        }

        let mut vars = Vec::with_capacity(model.num_variables());
        for var in model.variables() {
            let handle = match var.domain {
                VarDomain::Binary => add_binvar!(grb_model, name: &var.name),
                VarDomain::Integer => add_intvar!(grb_model, name: &var.name, bounds: var.lower..var.upper),
                VarDomain::Continuous => add_ctsvar!(grb_model, name: &var.name, bounds: var.lower..var.upper),
            }
            .map_err(backend_err("Failed to add variable"))?;
            vars.push(handle);
        }
        grb_model.update().map_err(backend_err("Failed to update model"))?;

        let mut constrs = Vec::with_capacity(model.num_constraints());
        for (id, constraint) in model.constraints() {
            let mut lhs = LinExpr::new();
            for &(var, coef) in constraint.expr.terms() {
                lhs.add_term(coef, vars[var.index()]);
            }
            let lhs = Expr::from(lhs);
            let rhs = constraint.rhs;
            let inequality = match constraint.relation {
                Relation::Le => c!(lhs <= rhs),
                Relation::Eq => c!(lhs == rhs),
                Relation::Ge => c!(lhs >= rhs),
            };
            let handle = grb_model
                .add_constr(&constraint.name, inequality)
                .map_err(backend_err("Failed to add constraint"))?;
            constrs.push((id, handle));
        }

        let mut objective = LinExpr::new();
        for &(var, coef) in model.objective().terms() {
            objective.add_term(coef, vars[var.index()]);
        }
        objective.add_constant(model.objective().constant_term());
        let sense = match model.sense() {
            Sense::Minimize => ModelSense::Minimize,
            Sense::Maximize => ModelSense::Maximize,
        };
        grb_model.set_objective(objective, sense).map_err(backend_err("Failed to set objective"))?;
        grb_model.update().map_err(backend_err("Failed to update model before optimization"))?;

        Ok(Translated { grb_model, vars, constrs })
    }
}

impl Solver for GurobiSolver {
    fn name(&self) -> &str {
        "gurobi"
    }

    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<SolveOutcome> {
        let start = Instant::now();
        let Translated { mut grb_model, vars, .. } = self.translate(model, config)?;

        grb_model.optimize().map_err(backend_err("Optimization failed"))?;
        let status = grb_model.status().map_err(backend_err("Failed to get status"))?;

        let status = match status {
            Status::Optimal => SolveStatus::Optimal,
            Status::Infeasible => SolveStatus::Infeasible,
            Status::Unbounded => SolveStatus::Unbounded,
            Status::InfOrUnbd => {
                // Re-solve without presolve reductions to tell the two apart.
                grb_model.set_param(param::DualReductions, 0).map_err(backend_err("Failed to disable dual reductions"))?;
                grb_model.optimize().map_err(backend_err("Optimization failed"))?;
                match grb_model.status().map_err(backend_err("Failed to get status"))? {
                    Status::Unbounded => SolveStatus::Unbounded,
                    _ => SolveStatus::Infeasible,
                }
            }
            Status::TimeLimit | Status::NodeLimit | Status::SolutionLimit => SolveStatus::TimeLimit,
            other => return Err(PlannerError::Backend(format!("Unexpected Gurobi status {:?}", other))),
        };

        let solution_count: i32 = grb_model.get_attr(attr::SolCount).unwrap_or(0);
        if solution_count == 0 || matches!(status, SolveStatus::Infeasible | SolveStatus::Unbounded) {
            return Ok(SolveOutcome::without_incumbent(status, start.elapsed().as_secs_f64()));
        }

        let values = grb_model
            .get_obj_attr_batch(attr::X, vars.iter().copied())
            .map_err(backend_err("Failed to read variable values"))?;
        let objective = grb_model.get_attr(attr::ObjVal).map_err(backend_err("Failed to read objective"))?;

        Ok(SolveOutcome {
            status,
            objective: Some(objective),
            values: Some(values),
            lower_bound: grb_model.get_attr(attr::ObjBound).ok(),
            nodes_explored: grb_model.get_attr(attr::NodeCount).ok().map(|n: f64| n as i64),
            computation_time: start.elapsed().as_secs_f64(),
        })
    }

    fn compute_iis(&self, model: &Model, config: &SolverConfig) -> Result<Vec<ConstraintId>> {
        let Translated { mut grb_model, constrs, .. } = self.translate(model, config)?;
        grb_model.compute_iis().map_err(backend_err("Failed to compute IIS"))?;

        let mut members = Vec::new();
        for (id, constr) in constrs {
            let flag: i32 = grb_model
                .get_obj_attr(attr::IISConstr, &constr)
                .map_err(backend_err("Failed to read IIS membership"))?;
            if flag != 0 {
                members.push(id);
            }
        }
        Ok(members)
    }
}
