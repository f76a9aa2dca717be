//! MILP formulations of the maintenance-scheduling problem.
//!
//! Each formulation validates its instance, declares variables and
//! constraints on a [`Model`], and reads a [`Solution`] back into a
//! domain-level plan. They share the model layer, the solve pipeline and the
//! big-M sizing rule; what differs is the constraint structure:
//!
//! - [`slot_assignment`]: replacement indicators linked to aircraft/slot
//!   assignments, slot capacities, leased spares and reliability groups
//! - [`inventory`]: per-period stock balance with orders, shortages and a
//!   maintenance trigger
//! - [`makespan`]: one start period per task, crew capacity over task
//!   durations, and a completion-time variable for the epsilon sweep

pub mod inventory;
pub mod makespan;
pub mod slot_assignment;

pub use inventory::{InventoryModel, InventoryPlan};
pub use makespan::{MakespanModel, MakespanPlan, ScheduledTask};
pub use slot_assignment::{SlotAssignmentModel, SlotAssignmentPlan};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::instance::Scenario;
use crate::model::Model;
use crate::solution::Solution;
use crate::solver::{solve_model, SolveStatus, Solver, SolverConfig};

/// A built MILP together with the knowledge needed to interpret its solution.
pub trait Formulation {
    type Plan;

    fn model(&self) -> &Model;

    fn interpret(&self, solution: &Solution) -> Self::Plan;
}

/// Solve a formulation and interpret the result.
pub fn solve<F, S>(formulation: &F, solver: &S, config: &SolverConfig) -> Result<F::Plan>
where
    F: Formulation,
    S: Solver + ?Sized,
{
    let solution = solve_model(formulation.model(), solver, config)?;
    Ok(formulation.interpret(&solution))
}

/// Big-M for `flag * M >= x` with `0 <= x <= upper`.
///
/// The tightest valid constant is the upper bound of the relaxed expression
/// itself: anything smaller cuts off feasible points, anything larger only
/// weakens the LP relaxation and the numerics. A zero bound still yields 1 so
/// the row stays well formed; a non-finite bound is passed through and
/// rejected when the row is added.
pub fn big_m(upper: f64) -> f64 {
    if upper.is_nan() || upper > 1.0 {
        upper
    } else {
        1.0
    }
}

/// Plan of any formulation, as produced by [`solve_scenario`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ScenarioPlan {
    SlotAssignment(SlotAssignmentPlan),
    Inventory(InventoryPlan),
    Makespan(MakespanPlan),
}

impl ScenarioPlan {
    pub fn instance(&self) -> &str {
        match self {
            ScenarioPlan::SlotAssignment(plan) => &plan.instance,
            ScenarioPlan::Inventory(plan) => &plan.instance,
            ScenarioPlan::Makespan(plan) => &plan.instance,
        }
    }

    pub fn status(&self) -> SolveStatus {
        match self {
            ScenarioPlan::SlotAssignment(plan) => plan.status,
            ScenarioPlan::Inventory(plan) => plan.status,
            ScenarioPlan::Makespan(plan) => plan.status,
        }
    }

    pub fn objective(&self) -> f64 {
        match self {
            ScenarioPlan::SlotAssignment(plan) => plan.objective,
            ScenarioPlan::Inventory(plan) => plan.objective,
            ScenarioPlan::Makespan(plan) => plan.objective,
        }
    }

    pub fn computation_time(&self) -> f64 {
        match self {
            ScenarioPlan::SlotAssignment(plan) => plan.computation_time,
            ScenarioPlan::Inventory(plan) => plan.computation_time,
            ScenarioPlan::Makespan(plan) => plan.computation_time,
        }
    }
}

impl std::fmt::Display for ScenarioPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioPlan::SlotAssignment(plan) => plan.fmt(f),
            ScenarioPlan::Inventory(plan) => plan.fmt(f),
            ScenarioPlan::Makespan(plan) => plan.fmt(f),
        }
    }
}

/// Build the model matching the scenario's variant.
pub fn build_model(scenario: &Scenario) -> Result<Model> {
    Ok(match scenario {
        Scenario::SlotAssignment(instance) => SlotAssignmentModel::build(instance)?.model().clone(),
        Scenario::Inventory(instance) => InventoryModel::build(instance)?.model().clone(),
        Scenario::Makespan(instance) => MakespanModel::build(instance)?.model().clone(),
    })
}

/// Build, solve and interpret any scenario.
pub fn solve_scenario<S: Solver + ?Sized>(scenario: &Scenario, solver: &S, config: &SolverConfig) -> Result<ScenarioPlan> {
    Ok(match scenario {
        Scenario::SlotAssignment(instance) => {
            ScenarioPlan::SlotAssignment(solve(&SlotAssignmentModel::build(instance)?, solver, config)?)
        }
        Scenario::Inventory(instance) => {
            ScenarioPlan::Inventory(solve(&InventoryModel::build(instance)?, solver, config)?)
        }
        Scenario::Makespan(instance) => {
            ScenarioPlan::Makespan(solve(&MakespanModel::build(instance)?, solver, config)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_m_uses_bound() {
        assert_eq!(big_m(0.0), 1.0);
        assert_eq!(big_m(1.0), 1.0);
        assert_eq!(big_m(4.0), 4.0);
        assert!(big_m(f64::INFINITY).is_infinite());
    }
}
