//! Parameters of the makespan / Pareto formulation.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::check_cost;
use crate::error::{invalid, Result};

/// One component that must be maintained exactly once in the horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceTask {
    pub name: String,
    /// Predicted remaining useful life: last period a preventive start is possible
    pub rul: usize,
    /// Periods a crew is busy with a preventive task
    pub preventive_duration: usize,
    /// Periods a crew is busy with a corrective task (start after the RUL)
    pub corrective_duration: usize,
    pub preventive_cost: f64,
    pub corrective_cost: f64,
}

impl MaintenanceTask {
    /// A start after the RUL means the component already failed.
    pub fn is_corrective(&self, start: usize) -> bool {
        start > self.rul
    }

    pub fn duration(&self, start: usize) -> usize {
        if self.is_corrective(start) {
            self.corrective_duration
        } else {
            self.preventive_duration
        }
    }
}

/// Complete makespan instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakespanInstance {
    pub name: String,
    /// Start periods are 0..periods
    pub periods: usize,
    /// Maintenance crews available in each period
    pub crews: i32,
    pub tasks: Vec<MaintenanceTask>,
    /// Cost per period of useful life thrown away by an early preventive start
    #[serde(default)]
    pub wasted_life_cost: f64,
    /// Weight of the completion time in the single-objective solve
    #[serde(default)]
    pub makespan_weight: f64,
}

impl MakespanInstance {
    pub fn random(seed: u64, tasks: usize, periods: usize, crews: i32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let tasks = (0..tasks)
            .map(|c| {
                let preventive_duration = rng.gen_range(1..=2);
                let preventive_cost = rng.gen_range(80..=120) as f64;
                MaintenanceTask {
                    name: format!("component-{}", c),
                    rul: rng.gen_range(1..periods.max(2)),
                    preventive_duration,
                    corrective_duration: preventive_duration + rng.gen_range(1..=2),
                    preventive_cost,
                    corrective_cost: preventive_cost * rng.gen_range(2.0..4.0),
                }
            })
            .collect();

        MakespanInstance {
            name: format!("makespan-seed{}", seed),
            periods,
            crews,
            tasks,
            wasted_life_cost: 10.0,
            makespan_weight: 0.0,
        }
    }

    pub fn max_duration(&self) -> usize {
        self.tasks
            .iter()
            .map(|t| t.preventive_duration.max(t.corrective_duration))
            .max()
            .unwrap_or(0)
    }

    /// Latest period any task can still be in progress, plus one.
    pub fn last_finish(&self) -> usize {
        self.periods.saturating_sub(1) + self.max_duration()
    }

    pub fn validate(&self) -> Result<()> {
        if self.periods == 0 {
            return invalid("makespan horizon needs at least one period");
        }
        if self.crews < 0 {
            return invalid(format!("crew capacity cannot be negative, got {}", self.crews));
        }
        if self.tasks.is_empty() {
            return invalid("makespan instance has no tasks");
        }
        check_cost(self.wasted_life_cost, "wasted-life cost")?;
        check_cost(self.makespan_weight, "makespan weight")?;
        for task in &self.tasks {
            if task.preventive_duration == 0 || task.corrective_duration == 0 {
                return invalid(format!("task {} needs durations of at least one period", task.name));
            }
            if self.periods.checked_add(task.preventive_duration.max(task.corrective_duration)).is_none() {
                return invalid(format!("task {} lasts too long to be scheduled", task.name));
            }
            check_cost(task.preventive_cost, &format!("preventive cost of {}", task.name))?;
            check_cost(task.corrective_cost, &format!("corrective cost of {}", task.name))?;
            if task.corrective_cost < task.preventive_cost {
                return invalid(format!("task {} is cheaper to repair after failure", task.name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_depends_on_rul() {
        let task = MaintenanceTask {
            name: "pump".to_string(),
            rul: 3,
            preventive_duration: 1,
            corrective_duration: 3,
            preventive_cost: 100.0,
            corrective_cost: 300.0,
        };
        assert_eq!(task.duration(3), 1);
        assert_eq!(task.duration(4), 3);
        assert!(task.is_corrective(4));
    }

    #[test]
    fn test_random_instance_is_valid() {
        let instance = MakespanInstance::random(3, 5, 8, 2);
        assert!(instance.validate().is_ok());
        assert_eq!(instance.tasks.len(), 5);
        assert!(instance.tasks.iter().all(|t| t.rul < 8));
        assert!(instance.last_finish() >= 8);
    }

    #[test]
    fn test_negative_crews_rejected() {
        let mut instance = MakespanInstance::random(3, 2, 5, 1);
        instance.crews = -2;
        assert!(instance.validate().is_err());
    }

    #[test]
    fn test_overflowing_duration_rejected() {
        let mut instance = MakespanInstance::random(3, 2, 5, 1);
        instance.tasks[0].corrective_duration = usize::MAX;
        assert!(instance.validate().is_err());
    }
}
