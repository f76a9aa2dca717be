//! Parameters of the inventory / predictive-demand formulation.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{check_cost, FailureModel};
use crate::error::{invalid, Result};

/// A stocked component type with its predicted demand per period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockedComponent {
    pub name: String,
    /// Stock on hand before the first period
    pub initial_stock: f64,
    /// Predicted replacements needed in each period
    pub demand: Vec<u32>,
}

impl StockedComponent {
    pub fn max_demand(&self) -> u32 {
        self.demand.iter().copied().max().unwrap_or(0)
    }

    pub fn total_demand(&self) -> u64 {
        self.demand.iter().map(|&d| u64::from(d)).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryCosts {
    /// Per unit ordered
    pub order: f64,
    /// Per unit held at the end of a period
    pub holding: f64,
    /// Per unit short in a period
    pub shortage: f64,
    /// Per maintenance event
    pub maintenance: f64,
    /// Weight of the completion time of the last maintenance event
    pub completion: f64,
}

impl Default for InventoryCosts {
    fn default() -> Self {
        InventoryCosts { order: 30.0, holding: 2.0, shortage: 150.0, maintenance: 40.0, completion: 5.0 }
    }
}

/// Complete inventory instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryInstance {
    pub name: String,
    /// Number of periods in the horizon
    pub periods: usize,
    pub components: Vec<StockedComponent>,
    #[serde(default)]
    pub costs: InventoryCosts,
}

impl InventoryInstance {
    /// Draw a random instance: each component gets a Weibull failure model
    /// and demand is sampled day by day from its hazard.
    pub fn random(seed: u64, components: usize, periods: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let components = (0..components)
            .map(|c| {
                let scale = rng.gen_range((periods as f64 * 0.5).max(1.0)..=(periods as f64 * 2.0).max(2.0));
                let failure = FailureModel::Weibull { shape: 2.0, scale };
                let demand = (0..periods)
                    .map(|t| u32::from(rng.gen_bool(failure.hazard(t as f64))))
                    .collect();
                StockedComponent {
                    name: format!("component-{}", c),
                    initial_stock: rng.gen_range(0..=1) as f64,
                    demand,
                }
            })
            .collect();

        InventoryInstance {
            name: format!("inventory-seed{}", seed),
            periods,
            components,
            costs: InventoryCosts::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.periods == 0 {
            return invalid("inventory horizon needs at least one period");
        }
        if self.components.is_empty() {
            return invalid("inventory instance has no components");
        }
        check_cost(self.costs.order, "order cost")?;
        check_cost(self.costs.holding, "holding cost")?;
        check_cost(self.costs.shortage, "shortage cost")?;
        check_cost(self.costs.maintenance, "maintenance cost")?;
        check_cost(self.costs.completion, "completion weight")?;
        for component in &self.components {
            if component.demand.len() != self.periods {
                return invalid(format!(
                    "component {} has {} demand entries for {} periods",
                    component.name,
                    component.demand.len(),
                    self.periods
                ));
            }
            if !component.initial_stock.is_finite() || component.initial_stock < 0.0 {
                return invalid(format!("component {} has invalid initial stock", component.name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_is_deterministic_per_seed() {
        let a = InventoryInstance::random(7, 3, 10);
        let b = InventoryInstance::random(7, 3, 10);
        assert!(a.validate().is_ok());
        for (x, y) in a.components.iter().zip(&b.components) {
            assert_eq!(x.demand, y.demand);
            assert_eq!(x.initial_stock, y.initial_stock);
        }
        assert!(a.components.iter().all(|c| c.demand.iter().all(|&d| d <= 1)));
    }

    #[test]
    fn test_demand_length_checked() {
        let mut instance = InventoryInstance::random(1, 2, 6);
        instance.components[1].demand.push(0);
        assert!(instance.validate().is_err());
    }

    #[test]
    fn test_negative_cost_rejected() {
        let mut instance = InventoryInstance::random(1, 2, 6);
        instance.costs.holding = -1.0;
        assert!(instance.validate().is_err());
    }
}
