//! Problem parameters for the three maintenance formulations.
//!
//! Instances are plain data: they can be built in code, loaded from JSON
//! (see [`Scenario`]) or drawn at random from a seed. Every instance is
//! validated before a model is built from it, so malformed input surfaces
//! as [`PlannerError::InvalidParameter`] instead of a solver status.

pub mod inventory;
pub mod makespan;
pub mod slot_assignment;

pub use inventory::{InventoryCosts, InventoryInstance, StockedComponent};
pub use makespan::{MaintenanceTask, MakespanInstance};
pub use slot_assignment::{
    Aircraft, Component, CostParameters, CriticalAircraft, GroupCoverage, Slot, SlotAssignmentInstance,
};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Weibull};

use crate::error::{invalid, PlannerError, Result};

/// Failure probability of a component as a function of its age in days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureModel {
    /// `min(rate * age, 1)`
    Linear { rate: f64 },
    /// Weibull cumulative distribution with the given shape and scale (days)
    Weibull { shape: f64, scale: f64 },
    /// Explicit probabilities indexed by whole days of age; the last entry repeats
    Table { probabilities: Vec<f64> },
}

impl FailureModel {
    /// Probability that the component has failed by the given age.
    pub fn probability(&self, age: f64) -> f64 {
        if age <= 0.0 {
            return match self {
                FailureModel::Table { probabilities } => probabilities.first().copied().unwrap_or(0.0),
                _ => 0.0,
            };
        }
        let p = match self {
            FailureModel::Linear { rate } => rate * age,
            FailureModel::Weibull { shape, scale } => {
                Weibull::new(*shape, *scale).map_or(0.0, |dist| dist.cdf(age))
            }
            FailureModel::Table { probabilities } => {
                let index = (age.floor() as usize).min(probabilities.len().saturating_sub(1));
                probabilities.get(index).copied().unwrap_or(0.0)
            }
        };
        p.clamp(0.0, 1.0)
    }

    /// Probability of failing during day `age`, given survival up to it.
    pub fn hazard(&self, age: f64) -> f64 {
        let before = self.probability(age);
        let after = self.probability(age + 1.0);
        if before >= 1.0 {
            1.0
        } else {
            ((after - before) / (1.0 - before)).clamp(0.0, 1.0)
        }
    }

    pub fn validate(&self, context: &str) -> Result<()> {
        match self {
            FailureModel::Linear { rate } => {
                if !rate.is_finite() || *rate < 0.0 {
                    return invalid(format!("{}: failure rate must be finite and non-negative", context));
                }
            }
            FailureModel::Weibull { shape, scale } => {
                if !(shape.is_finite() && scale.is_finite() && *shape > 0.0 && *scale > 0.0) {
                    return invalid(format!("{}: Weibull shape and scale must be positive", context));
                }
            }
            FailureModel::Table { probabilities } => {
                if probabilities.is_empty() {
                    return invalid(format!("{}: failure table is empty", context));
                }
                if probabilities.iter().any(|p| !(0.0..=1.0).contains(p)) {
                    return invalid(format!("{}: failure probabilities must lie in [0, 1]", context));
                }
            }
        }
        Ok(())
    }
}

/// Reject NaN, infinite and negative cost coefficients.
pub(crate) fn check_cost(value: f64, what: &str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return invalid(format!("{} must be a finite non-negative number, got {}", what, value));
    }
    Ok(())
}

/// A scenario file: one instance of any formulation, tagged by `variant`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Scenario {
    SlotAssignment(SlotAssignmentInstance),
    Inventory(InventoryInstance),
    Makespan(MakespanInstance),
}

impl Scenario {
    pub fn name(&self) -> &str {
        match self {
            Scenario::SlotAssignment(i) => &i.name,
            Scenario::Inventory(i) => &i.name,
            Scenario::Makespan(i) => &i.name,
        }
    }

    pub fn variant(&self) -> &'static str {
        match self {
            Scenario::SlotAssignment(_) => "slot_assignment",
            Scenario::Inventory(_) => "inventory",
            Scenario::Makespan(_) => "makespan",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Scenario::SlotAssignment(i) => i.validate(),
            Scenario::Inventory(i) => i.validate(),
            Scenario::Makespan(i) => i.validate(),
        }
    }

    /// Load and validate a scenario from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path).map_err(|e| {
            PlannerError::InvalidParameter(format!("Cannot open {}: {}", path.as_ref().display(), e))
        })?;
        let scenario: Scenario = serde_json::from_reader(BufReader::new(file))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_failure_matches_ramp() {
        let model = FailureModel::Linear { rate: 0.1 };
        assert_eq!(model.probability(0.0), 0.0);
        assert!((model.probability(3.0) - 0.3).abs() < 1e-12);
        assert_eq!(model.probability(15.0), 1.0);
    }

    #[test]
    fn test_weibull_failure_is_monotone() {
        let model = FailureModel::Weibull { shape: 2.0, scale: 10.0 };
        let mut previous = 0.0;
        for day in 1..30 {
            let p = model.probability(day as f64);
            assert!(p >= previous && p <= 1.0);
            previous = p;
        }
        // F(scale) = 1 - 1/e
        assert!((model.probability(10.0) - (1.0 - (-1.0f64).exp())).abs() < 1e-9);
    }

    #[test]
    fn test_table_repeats_last_entry() {
        let model = FailureModel::Table { probabilities: vec![0.0, 0.2, 0.5] };
        assert_eq!(model.probability(1.0), 0.2);
        assert_eq!(model.probability(9.0), 0.5);
        assert!((model.hazard(1.0) - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_models_rejected() {
        assert!(FailureModel::Linear { rate: -1.0 }.validate("c").is_err());
        assert!(FailureModel::Weibull { shape: 0.0, scale: 1.0 }.validate("c").is_err());
        assert!(FailureModel::Table { probabilities: vec![1.5] }.validate("c").is_err());
        assert!(FailureModel::Table { probabilities: vec![] }.validate("c").is_err());
    }

    #[test]
    fn test_scenario_json_round_trip_keeps_variant() {
        let scenario = Scenario::SlotAssignment(SlotAssignmentInstance::example());
        let json = serde_json::to_string(&scenario).unwrap();
        assert!(json.contains("\"variant\":\"slot_assignment\""));
        let back: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(back.variant(), "slot_assignment");
        assert!(back.validate().is_ok());
    }
}
