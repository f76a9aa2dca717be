//! Inventory formulation driven by predicted demand.
//!
//! Per component `c` and period `t`:
//! - `order[c,t]` integer units ordered
//! - `stock[c,t]` continuous stock at the end of the period
//! - `short[c,t]` continuous units missing in the period
//! - `maint[c,t]` binary maintenance flag
//!
//! plus one continuous `C`, the end of the latest maintenance period.

use serde::{Deserialize, Serialize};

use super::{big_m, Formulation};
use crate::error::Result;
use crate::instance::InventoryInstance;
use crate::model::{LinearExpr, Model, Relation, Sense, VarDomain, VarId};
use crate::report::{ChartData, Series};
use crate::solution::Solution;
use crate::solver::SolveStatus;

/// Values of one component over the horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentTrajectory {
    pub name: String,
    pub orders: Vec<i64>,
    pub stock: Vec<f64>,
    pub shortage: Vec<f64>,
    pub maintenance: Vec<bool>,
}

impl ComponentTrajectory {
    pub fn maintenance_periods(&self) -> Vec<usize> {
        self.maintenance
            .iter()
            .enumerate()
            .filter(|(_, m)| **m)
            .map(|(t, _)| t)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryPlan {
    pub instance: String,
    pub status: SolveStatus,
    pub objective: f64,
    pub components: Vec<ComponentTrajectory>,
    /// End of the latest maintenance period
    pub completion: f64,
    pub computation_time: f64,
}

impl InventoryPlan {
    /// Stock and order series of one component, one label per period.
    pub fn chart_data(&self, component: usize) -> Option<ChartData> {
        let trajectory = self.components.get(component)?;
        Some(ChartData {
            title: format!("Inventory of {}", trajectory.name),
            labels: (0..trajectory.stock.len()).map(|t| format!("t{}", t)).collect(),
            first: Series { name: "stock".to_string(), values: trajectory.stock.clone() },
            second: Series {
                name: "orders".to_string(),
                values: trajectory.orders.iter().map(|&o| o as f64).collect(),
            },
        })
    }
}

struct ComponentVars {
    order: Vec<VarId>,
    stock: Vec<VarId>,
    short: Vec<VarId>,
    maint: Vec<VarId>,
}

/// Inventory MILP built from an instance
pub struct InventoryModel {
    instance: InventoryInstance,
    model: Model,
    vars: Vec<ComponentVars>,
    completion: VarId,
}

impl InventoryModel {
    pub fn build(instance: &InventoryInstance) -> Result<Self> {
        instance.validate()?;
        let mut model = Model::new(&format!("inventory_{}", instance.name));
        let periods = instance.periods;
        let costs = &instance.costs;

        let completion = model.declare_variable("C", VarDomain::Continuous, 0.0, periods as f64)?;
        let mut objective = completion * costs.completion;
        let mut vars = Vec::with_capacity(instance.components.len());

        for (c, component) in instance.components.iter().enumerate() {
            // Ordering more than the whole demand is never useful.
            let order_bound = component.total_demand() as f64;
            let mut cv = ComponentVars { order: vec![], stock: vec![], short: vec![], maint: vec![] };
            for t in 0..periods {
                cv.order.push(model.declare_variable(&format!("order[{},{}]", c, t), VarDomain::Integer, 0.0, order_bound)?);
                cv.stock.push(model.declare_variable(&format!("stock[{},{}]", c, t), VarDomain::Continuous, 0.0, f64::INFINITY)?);
                cv.short.push(model.declare_variable(&format!("short[{},{}]", c, t), VarDomain::Continuous, 0.0, f64::INFINITY)?);
                cv.maint.push(model.binary(&format!("maint[{},{}]", c, t))?);

                objective.add_term(cv.order[t], costs.order);
                objective.add_term(cv.stock[t], costs.holding);
                objective.add_term(cv.short[t], costs.shortage);
                objective.add_term(cv.maint[t], costs.maintenance);
            }

            let m = big_m(component.max_demand() as f64);
            for t in 0..periods {
                let demand = component.demand[t] as f64;

                // stock[t] = stock[t-1] + order[t] - demand[t] + short[t]
                let mut balance = LinearExpr::from(cv.stock[t]) - LinearExpr::from(cv.order[t]) - LinearExpr::from(cv.short[t]);
                let rhs = if t == 0 {
                    component.initial_stock - demand
                } else {
                    balance.add_term(cv.stock[t - 1], -1.0);
                    -demand
                };
                model.add_constraint(&format!("balance[{},{}]", c, t), balance, Relation::Eq, rhs)?;

                model.add_constraint(&format!("trigger[{},{}]", c, t), cv.maint[t] * m, Relation::Ge, demand)?;

                model.add_constraint(
                    &format!("completion[{},{}]", c, t),
                    LinearExpr::from(completion) - cv.maint[t] * (t + 1) as f64,
                    Relation::Ge,
                    0.0,
                )?;
            }
            vars.push(cv);
        }
        model.set_objective(objective, Sense::Minimize)?;

        log::debug!("Built {}", model);
        Ok(InventoryModel { instance: instance.clone(), model, vars, completion })
    }

    pub fn instance(&self) -> &InventoryInstance {
        &self.instance
    }

    pub fn stock_var(&self, component: usize, period: usize) -> VarId {
        self.vars[component].stock[period]
    }

    pub fn order_var(&self, component: usize, period: usize) -> VarId {
        self.vars[component].order[period]
    }

    pub fn shortage_var(&self, component: usize, period: usize) -> VarId {
        self.vars[component].short[period]
    }

    pub fn maintenance_var(&self, component: usize, period: usize) -> VarId {
        self.vars[component].maint[period]
    }

    pub fn completion_var(&self) -> VarId {
        self.completion
    }
}

impl Formulation for InventoryModel {
    type Plan = InventoryPlan;

    fn model(&self) -> &Model {
        &self.model
    }

    fn interpret(&self, solution: &Solution) -> InventoryPlan {
        let components = self
            .instance
            .components
            .iter()
            .zip(&self.vars)
            .map(|(component, cv)| ComponentTrajectory {
                name: component.name.clone(),
                orders: cv.order.iter().map(|&v| solution.integer(v)).collect(),
                stock: cv.stock.iter().map(|&v| solution.value(v)).collect(),
                shortage: cv.short.iter().map(|&v| solution.value(v)).collect(),
                maintenance: cv.maint.iter().map(|&v| solution.is_set(v)).collect(),
            })
            .collect();

        InventoryPlan {
            instance: self.instance.name.clone(),
            status: solution.status,
            objective: solution.objective,
            components,
            completion: solution.value(self.completion),
            computation_time: solution.computation_time,
        }
    }
}

impl std::fmt::Display for InventoryPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Inventory plan for {} ({})", self.instance, self.status)?;
        writeln!(f, "  Objective: {:.2}", self.objective)?;
        writeln!(f, "  Completion: {:.1}", self.completion)?;
        for trajectory in &self.components {
            writeln!(f, "  {}", trajectory.name)?;
            writeln!(f, "    orders:      {:?}", trajectory.orders)?;
            let stock: Vec<String> = trajectory.stock.iter().map(|s| format!("{:.1}", s)).collect();
            writeln!(f, "    stock:       [{}]", stock.join(", "))?;
            writeln!(f, "    maintenance: {:?}", trajectory.maintenance_periods())?;
        }
        write!(f, "  Time: {:.4}s", self.computation_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::solve;
    use crate::instance::{InventoryCosts, StockedComponent};
    use crate::solver::{solve_model, MicrolpSolver, SolverConfig};

    fn small_instance() -> InventoryInstance {
        InventoryInstance {
            name: "two-pumps".to_string(),
            periods: 4,
            components: vec![
                StockedComponent { name: "pump".to_string(), initial_stock: 1.0, demand: vec![0, 1, 0, 1] },
                StockedComponent { name: "valve".to_string(), initial_stock: 0.0, demand: vec![2, 0, 0, 0] },
            ],
            costs: InventoryCosts::default(),
        }
    }

    #[test]
    fn test_balance_holds_on_solution() {
        let instance = small_instance();
        let built = InventoryModel::build(&instance).unwrap();
        let solution = solve_model(built.model(), &MicrolpSolver::new(), &SolverConfig::default()).unwrap();

        for (c, component) in instance.components.iter().enumerate() {
            let mut previous = component.initial_stock;
            for t in 0..instance.periods {
                let stock = solution.value(built.stock_var(c, t));
                let expected = previous + solution.value(built.order_var(c, t)) - component.demand[t] as f64
                    + solution.value(built.shortage_var(c, t));
                assert!((stock - expected).abs() < 1e-6, "component {} period {}", c, t);
                assert!(stock >= -1e-9);
                previous = stock;
            }
        }
    }

    #[test]
    fn test_demand_triggers_maintenance() {
        let instance = small_instance();
        let plan = solve(&InventoryModel::build(&instance).unwrap(), &MicrolpSolver::new(), &SolverConfig::default()).unwrap();
        assert_eq!(plan.status, SolveStatus::Optimal);
        assert_eq!(plan.components[0].maintenance_periods(), vec![1, 3]);
        assert_eq!(plan.components[1].maintenance_periods(), vec![0]);
        // Latest maintenance is in period 3, which ends at 4.
        assert!((plan.completion - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_trigger_big_m_matches_max_demand() {
        let built = InventoryModel::build(&small_instance()).unwrap();
        let (_, row) = built.model().constraints().find(|(_, c)| c.name == "trigger[1,0]").unwrap();
        assert_eq!(row.expr.terms(), &[(built.maintenance_var(1, 0), 2.0)]);
        assert_eq!(row.rhs, 2.0);
    }

    #[test]
    fn test_large_demand_order_bound() {
        let mut instance = small_instance();
        instance.components[0].demand = vec![u32::MAX, 1, 0, 0];
        let built = InventoryModel::build(&instance).unwrap();
        let order = built.model().variable(built.order_var(0, 1));
        assert_eq!(order.upper, u32::MAX as f64 + 1.0);
        assert!(built.model().objective().is_finite());
    }

    #[test]
    fn test_chart_data_has_two_series() {
        let plan = solve(
            &InventoryModel::build(&small_instance()).unwrap(),
            &MicrolpSolver::new(),
            &SolverConfig::default(),
        )
        .unwrap();
        let chart = plan.chart_data(0).unwrap();
        assert_eq!(chart.labels.len(), 4);
        assert_eq!(chart.first.values.len(), 4);
        assert_eq!(chart.second.values.len(), 4);
        assert!(plan.chart_data(5).is_none());
    }
}
