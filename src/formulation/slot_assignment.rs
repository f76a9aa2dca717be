//! Slot-assignment formulation.
//!
//! Variables:
//! - `X[a,c,s]` binary: component `c` of aircraft `a` is replaced in slot `s`
//! - `Y[a,s]` binary: aircraft `a` is assigned to slot `s`
//! - `L[d]` integer: parts leased on day `d`
//! - `Lnew[d]` integer: parts newly leased on day `d`
//!
//! Objective: replacement cost (fixed + expected failure cost at the slot day)
//! for replaced components, the same cost evaluated at the end of the horizon
//! for postponed ones, slot assignment cost and leasing cost.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Formulation;
use crate::error::Result;
use crate::instance::{GroupCoverage, SlotAssignmentInstance};
use crate::model::{LinearExpr, Model, Relation, Sense, VarDomain, VarId};
use crate::solution::Solution;
use crate::solver::SolveStatus;

/// The four cost terms of the objective, kept separately for reporting.
#[derive(Debug, Clone, Default)]
struct CostTerms {
    fixed: LinearExpr,
    expected_failure: LinearExpr,
    slot: LinearExpr,
    leasing: LinearExpr,
}

/// Objective broken down by cost component
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Fixed replacement cost (replaced and postponed components)
    pub fixed: f64,
    /// Probability-weighted failure penalty
    pub expected_failure: f64,
    /// Slot assignment cost
    pub slot: f64,
    /// Daily and new-lease cost
    pub leasing: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.fixed + self.expected_failure + self.slot + self.leasing
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotVisit {
    pub aircraft: usize,
    pub slot: usize,
    pub day: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replacement {
    pub aircraft: usize,
    pub component: usize,
    pub slot: usize,
    pub day: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseDay {
    pub day: i64,
    pub leased: i64,
    pub newly_leased: i64,
}

/// Maintenance plan read back from a solved slot-assignment model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotAssignmentPlan {
    pub instance: String,
    pub status: SolveStatus,
    pub objective: f64,
    pub visits: Vec<SlotVisit>,
    pub replacements: Vec<Replacement>,
    /// (aircraft, component) pairs left for after the horizon
    pub postponed: Vec<(usize, usize)>,
    /// Days with a non-zero lease
    pub leases: Vec<LeaseDay>,
    pub costs: CostBreakdown,
    pub computation_time: f64,
}

/// Slot-assignment MILP built from an instance
pub struct SlotAssignmentModel {
    instance: SlotAssignmentInstance,
    model: Model,
    replace: BTreeMap<(usize, usize, usize), VarId>,
    assign: BTreeMap<(usize, usize), VarId>,
    leased: Vec<VarId>,
    new_leases: Vec<VarId>,
    terms: CostTerms,
}

impl SlotAssignmentModel {
    pub fn build(instance: &SlotAssignmentInstance) -> Result<Self> {
        instance.validate()?;
        let mut model = Model::new(&format!("slot_assignment_{}", instance.name));
        let mut replace = BTreeMap::new();
        let mut assign = BTreeMap::new();

        for (a, aircraft) in instance.aircraft.iter().enumerate() {
            for s in instance.slots_of(a) {
                for c in 0..aircraft.components.len() {
                    let var = model.binary(&format!("X[{},{},{}]", a, c, s))?;
                    replace.insert((a, c, s), var);
                }
                assign.insert((a, s), model.binary(&format!("Y[{},{}]", a, s))?);
            }
        }

        // Never more parts leased than components in the fleet.
        let lease_bound = instance.num_components() as f64;
        let mut leased = Vec::new();
        let mut new_leases = Vec::new();
        for day in instance.days() {
            leased.push(model.declare_variable(&format!("L[{}]", day), VarDomain::Integer, 0.0, lease_bound)?);
            new_leases.push(model.declare_variable(&format!("Lnew[{}]", day), VarDomain::Integer, 0.0, lease_bound)?);
        }

        let mut this = SlotAssignmentModel {
            instance: instance.clone(),
            model,
            replace,
            assign,
            leased,
            new_leases,
            terms: CostTerms::default(),
        };
        this.set_objective()?;
        this.add_linking()?;
        this.add_leasing()?;
        this.add_slot_limits()?;
        this.add_reliability()?;

        log::debug!("Built {}", this.model);
        Ok(this)
    }

    fn set_objective(&mut self) -> Result<()> {
        let instance = &self.instance;
        let mut terms = CostTerms::default();
        let end_day = instance.end_day();

        for (a, aircraft) in instance.aircraft.iter().enumerate() {
            for (c, component) in aircraft.components.iter().enumerate() {
                // Postponed: (1 - sum_s X) * cost at the end of the horizon.
                let (fixed_end, failure_end) = instance.replacement_cost(component, end_day);
                terms.fixed.add_constant(fixed_end);
                terms.expected_failure.add_constant(failure_end);

                for s in instance.slots_of(a) {
                    let x = self.replace[&(a, c, s)];
                    let (fixed, failure) = instance.replacement_cost(component, instance.slots[s].day);
                    terms.fixed.add_term(x, fixed - fixed_end);
                    terms.expected_failure.add_term(x, failure - failure_end);
                }
            }
        }
        for (&(_, s), &y) in &self.assign {
            terms.slot.add_term(y, instance.slots[s].cost);
        }
        for (&l, &n) in self.leased.iter().zip(&self.new_leases) {
            terms.leasing.add_term(l, instance.costs.lease_per_day);
            terms.leasing.add_term(n, instance.costs.new_lease);
        }

        let objective = terms.fixed.clone() + terms.expected_failure.clone() + terms.slot.clone() + terms.leasing.clone();
        self.model.set_objective(objective, Sense::Minimize)?;
        self.terms = terms;
        Ok(())
    }

    /// Y[a,s] >= X[a,c,s] and Y[a,s] <= sum_c X[a,c,s]
    fn add_linking(&mut self) -> Result<()> {
        for (&(a, s), &y) in &self.assign {
            let components = self.instance.aircraft[a].components.len();
            let mut sum = LinearExpr::from(y);
            for c in 0..components {
                let x = self.replace[&(a, c, s)];
                self.model.add_constraint(
                    &format!("Y_geq_X[{},{},{}]", a, c, s),
                    LinearExpr::from(y) - LinearExpr::from(x),
                    Relation::Ge,
                    0.0,
                )?;
                sum.add_term(x, -1.0);
            }
            self.model.add_constraint(&format!("Y_leq_sumX[{},{}]", a, s), sum, Relation::Le, 0.0)?;
        }
        Ok(())
    }

    /// L[d] >= replacements still in repair on day d - spares on day d, and
    /// Lnew[d] >= L[d] - L[d-1].
    fn add_leasing(&mut self) -> Result<()> {
        let lead = self.instance.repair_lead_time;
        for (i, day) in self.instance.days().enumerate() {
            let mut expr = LinearExpr::from(self.leased[i]);
            for (&(_, _, s), &x) in &self.replace {
                let slot_day = self.instance.slots[s].day;
                if slot_day <= day && day < slot_day + lead {
                    expr.add_term(x, -1.0);
                }
            }
            let spares = self.instance.spares_on(day) as f64;
            self.model.add_constraint(&format!("lease[{}]", day), expr, Relation::Ge, -spares)?;

            let mut growth = LinearExpr::from(self.new_leases[i]) - LinearExpr::from(self.leased[i]);
            if i > 0 {
                growth.add_term(self.leased[i - 1], 1.0);
            }
            self.model.add_constraint(&format!("new_lease[{}]", day), growth, Relation::Ge, 0.0)?;
        }
        Ok(())
    }

    /// At most one slot per aircraft, and slot capacities.
    fn add_slot_limits(&mut self) -> Result<()> {
        for a in 0..self.instance.aircraft.len() {
            let slots = self.instance.slots_of(a).into_iter().map(|s| self.assign[&(a, s)]);
            self.model.add_constraint(&format!("one_slot[{}]", a), LinearExpr::sum(slots), Relation::Le, 1.0)?;
        }
        for (s, slot) in self.instance.slots.iter().enumerate() {
            let users = self.assign.iter().filter(|(key, _)| key.1 == s).map(|(_, &y)| y);
            self.model.add_constraint(
                &format!("slot_capacity[{}]", s),
                LinearExpr::sum(users),
                Relation::Le,
                slot.capacity as f64,
            )?;
        }
        Ok(())
    }

    /// Critical aircraft: cover every reliability group with replacements in
    /// slots strictly before the risk day.
    fn add_reliability(&mut self) -> Result<()> {
        for critical in &self.instance.critical {
            let a = critical.aircraft;
            let early_slots: Vec<usize> = self
                .instance
                .slots_of(a)
                .into_iter()
                .filter(|&s| self.instance.slots[s].day < critical.risk_day)
                .collect();
            for (g, group) in critical.groups.iter().enumerate() {
                let vars = group
                    .iter()
                    .flat_map(|&c| early_slots.iter().map(move |&s| (c, s)))
                    .map(|(c, s)| self.replace[&(a, c, s)]);
                let required = match self.instance.coverage {
                    GroupCoverage::AtLeastOne => 1.0,
                    GroupCoverage::AllComponents => group.len() as f64,
                };
                self.model.add_constraint(
                    &format!("reliability[{},{}]", a, g),
                    LinearExpr::sum(vars),
                    Relation::Ge,
                    required,
                )?;
            }
        }
        Ok(())
    }

    pub fn instance(&self) -> &SlotAssignmentInstance {
        &self.instance
    }

    pub fn replace_var(&self, aircraft: usize, component: usize, slot: usize) -> Option<VarId> {
        self.replace.get(&(aircraft, component, slot)).copied()
    }

    pub fn assign_var(&self, aircraft: usize, slot: usize) -> Option<VarId> {
        self.assign.get(&(aircraft, slot)).copied()
    }

    /// Leased-count variable for the `index`-th day of `instance().days()`
    pub fn leased_var(&self, index: usize) -> VarId {
        self.leased[index]
    }

    pub fn new_lease_var(&self, index: usize) -> VarId {
        self.new_leases[index]
    }

    /// Cost terms evaluated at the solution values.
    pub fn cost_breakdown(&self, solution: &Solution) -> CostBreakdown {
        CostBreakdown {
            fixed: solution.evaluate(&self.terms.fixed),
            expected_failure: solution.evaluate(&self.terms.expected_failure),
            slot: solution.evaluate(&self.terms.slot),
            leasing: solution.evaluate(&self.terms.leasing),
        }
    }
}

impl Formulation for SlotAssignmentModel {
    type Plan = SlotAssignmentPlan;

    fn model(&self) -> &Model {
        &self.model
    }

    fn interpret(&self, solution: &Solution) -> SlotAssignmentPlan {
        let instance = &self.instance;
        let visits = self
            .assign
            .iter()
            .filter(|(_, y)| solution.is_set(**y))
            .map(|(&(aircraft, slot), _)| SlotVisit { aircraft, slot, day: instance.slots[slot].day })
            .collect();
        let replacements: Vec<Replacement> = self
            .replace
            .iter()
            .filter(|(_, x)| solution.is_set(**x))
            .map(|(&(aircraft, component, slot), _)| Replacement {
                aircraft,
                component,
                slot,
                day: instance.slots[slot].day,
            })
            .collect();
        let postponed = instance
            .aircraft
            .iter()
            .enumerate()
            .flat_map(|(a, aircraft)| (0..aircraft.components.len()).map(move |c| (a, c)))
            .filter(|&(a, c)| !replacements.iter().any(|r| r.aircraft == a && r.component == c))
            .collect();
        let leases = instance
            .days()
            .enumerate()
            .map(|(i, day)| LeaseDay {
                day,
                leased: solution.integer(self.leased[i]),
                newly_leased: solution.integer(self.new_leases[i]),
            })
            .filter(|l| l.leased > 0 || l.newly_leased > 0)
            .collect();

        SlotAssignmentPlan {
            instance: instance.name.clone(),
            status: solution.status,
            objective: solution.objective,
            visits,
            replacements,
            postponed,
            leases,
            costs: self.cost_breakdown(solution),
            computation_time: solution.computation_time,
        }
    }
}

impl std::fmt::Display for SlotAssignmentPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Slot assignment plan for {} ({})", self.instance, self.status)?;
        writeln!(f, "  Objective: {:.2}", self.objective)?;
        for visit in &self.visits {
            writeln!(f, "  Aircraft {} -> slot {} (day {})", visit.aircraft, visit.slot, visit.day)?;
            for r in self.replacements.iter().filter(|r| r.aircraft == visit.aircraft && r.slot == visit.slot) {
                writeln!(f, "    replace component {}", r.component)?;
            }
        }
        if !self.postponed.is_empty() {
            writeln!(f, "  Postponed: {:?}", self.postponed)?;
        }
        for lease in &self.leases {
            writeln!(f, "  Day {}: {} leased, {} new", lease.day, lease.leased, lease.newly_leased)?;
        }
        writeln!(
            f,
            "  Costs: fixed {:.2}, expected failure {:.2}, slot {:.2}, leasing {:.2}",
            self.costs.fixed, self.costs.expected_failure, self.costs.slot, self.costs.leasing
        )?;
        write!(f, "  Time: {:.4}s", self.computation_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;
    use crate::formulation::solve;
    use crate::solver::{solve_model, MicrolpSolver, SolverConfig};

    const TOL: f64 = 1e-6;

    #[test]
    fn test_model_dimensions() {
        let built = SlotAssignmentModel::build(&SlotAssignmentInstance::example()).unwrap();
        let model = built.model();
        // 2 aircraft * 4 components * 3 slots + 2 * 3 assignments + 2 * 10 lease counters
        assert_eq!(model.num_variables(), 24 + 6 + 20);
        // linking 24 + 6, leasing 10 + 10, one_slot 2, capacity 3, reliability 3
        assert_eq!(model.num_constraints(), 30 + 20 + 2 + 3 + 3);
    }

    #[test]
    fn test_all_coefficients_finite() {
        let built = SlotAssignmentModel::build(&SlotAssignmentInstance::example()).unwrap();
        let model = built.model();
        assert!(model.objective().is_finite());
        for (_, c) in model.constraints() {
            assert!(c.expr.is_finite() && c.rhs.is_finite(), "{} is not finite", c.name);
        }
    }

    #[test]
    fn test_example_solves_with_consistent_costs() {
        let built = SlotAssignmentModel::build(&SlotAssignmentInstance::example()).unwrap();
        let plan = solve(&built, &MicrolpSolver::new(), &SolverConfig::default()).unwrap();
        assert_eq!(plan.status, SolveStatus::Optimal);
        assert!((plan.costs.total() - plan.objective).abs() < TOL);

        // Critical aircraft 0 must visit a slot before day 5.
        assert!(plan.visits.iter().any(|v| v.aircraft == 0 && v.day < 5));
        // Every group {0,1}, {1,2}, {2,3} is covered.
        for group in [[0, 1], [1, 2], [2, 3]] {
            assert!(plan
                .replacements
                .iter()
                .any(|r| r.aircraft == 0 && r.day < 5 && group.contains(&r.component)));
        }
    }

    #[test]
    fn test_linking_and_capacity_hold() {
        let instance = SlotAssignmentInstance::example();
        let built = SlotAssignmentModel::build(&instance).unwrap();
        let solution = solve_model(built.model(), &MicrolpSolver::new(), &SolverConfig::default()).unwrap();

        for a in 0..instance.aircraft.len() {
            for s in instance.slots_of(a) {
                let y = solution.is_set(built.assign_var(a, s).unwrap());
                let any_x = (0..4).any(|c| solution.is_set(built.replace_var(a, c, s).unwrap()));
                assert_eq!(y, any_x, "aircraft {} slot {}", a, s);
            }
        }
        for (s, slot) in instance.slots.iter().enumerate() {
            let used = (0..instance.aircraft.len())
                .filter(|&a| solution.is_set(built.assign_var(a, s).unwrap()))
                .count();
            assert!(used as i32 <= slot.capacity);
        }
        assert!(built.model().violations(&solution.values, 1e-6).is_empty());
    }

    #[test]
    fn test_leases_cover_shortfall() {
        // One spare per day and a critical aircraft needing three groups covered
        // forces leasing when more than one part is in repair at once.
        let mut instance = SlotAssignmentInstance::example();
        instance.spares_per_day = vec![0; 10];
        let built = SlotAssignmentModel::build(&instance).unwrap();
        let plan = solve(&built, &MicrolpSolver::new(), &SolverConfig::default()).unwrap();

        let in_repair = |day: i64| {
            plan.replacements
                .iter()
                .filter(|r| r.day <= day && day < r.day + instance.repair_lead_time)
                .count() as i64
        };
        for day in instance.days() {
            let leased = plan.leases.iter().find(|l| l.day == day).map_or(0, |l| l.leased);
            assert!(leased >= in_repair(day));
        }
        assert!(plan.costs.leasing > 0.0);
    }

    #[test]
    fn test_zero_capacity_is_infeasible_with_conflict() {
        let mut instance = SlotAssignmentInstance::example();
        for slot in &mut instance.slots {
            slot.capacity = 0;
        }
        let built = SlotAssignmentModel::build(&instance).unwrap();
        match solve(&built, &MicrolpSolver::new(), &SolverConfig::default()) {
            Err(PlannerError::Infeasible(conflict)) => {
                assert!(!conflict.is_empty());
                assert!(conflict.mentions("slot_capacity"));
                assert!(conflict.mentions("reliability"));
            }
            other => panic!("expected infeasible, got {:?}", other.map(|p| p.objective)),
        }
    }

    #[test]
    fn test_all_components_coverage_replaces_whole_groups() {
        let mut instance = SlotAssignmentInstance::example();
        instance.coverage = GroupCoverage::AllComponents;
        let built = SlotAssignmentModel::build(&instance).unwrap();
        let plan = solve(&built, &MicrolpSolver::new(), &SolverConfig::default()).unwrap();
        for c in 0..4 {
            assert!(plan.replacements.iter().any(|r| r.aircraft == 0 && r.component == c && r.day < 5));
        }
    }
}
