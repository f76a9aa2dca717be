//! Parameters of the slot-assignment formulation: aircraft with replaceable
//! components, maintenance slots on fixed days, a spare-part pool with a
//! repair lead time, and reliability requirements for critical aircraft.

use std::collections::BTreeSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{check_cost, FailureModel};
use crate::error::{invalid, Result};

/// A replaceable component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    /// Day the component was installed
    pub install_day: i64,
    pub failure: FailureModel,
}

/// An aircraft (asset) and its components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aircraft {
    pub name: String,
    pub components: Vec<Component>,
    /// Indices of the slots this aircraft may use; all slots when absent
    #[serde(default)]
    pub allowed_slots: Option<Vec<usize>>,
}

/// A maintenance slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    /// Day the slot takes place
    pub day: i64,
    /// Maximum number of aircraft served in this slot
    pub capacity: i32,
    /// Cost of assigning an aircraft to this slot
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostParameters {
    /// Fixed cost of replacing one component
    pub fixed_replacement: f64,
    /// Extra cost incurred when a component fails in service
    pub failure_penalty: f64,
    /// Cost per leased part per day
    pub lease_per_day: f64,
    /// Cost of starting a new lease
    pub new_lease: f64,
}

/// How a reliability group has to be covered before the risk day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupCoverage {
    /// At least one component of every group is replaced
    #[default]
    AtLeastOne,
    /// Every component of every group is replaced
    AllComponents,
}

/// A critical aircraft that must keep enough working components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalAircraft {
    /// Index into `SlotAssignmentInstance::aircraft`
    pub aircraft: usize,
    /// Replacements must happen in slots strictly before this day
    pub risk_day: i64,
    /// Minimal combinations of component indices that must stay working
    pub groups: Vec<Vec<usize>>,
}

/// Complete slot-assignment instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotAssignmentInstance {
    pub name: String,
    /// First day of the planning horizon
    pub start_day: i64,
    /// Number of planning days
    pub horizon: i64,
    /// Days a replaced component spends in repair
    pub repair_lead_time: i64,
    pub aircraft: Vec<Aircraft>,
    pub slots: Vec<Slot>,
    pub costs: CostParameters,
    /// Spares on hand at the start of each day of `days()`
    pub spares_per_day: Vec<i32>,
    #[serde(default)]
    pub critical: Vec<CriticalAircraft>,
    #[serde(default)]
    pub coverage: GroupCoverage,
}

impl SlotAssignmentInstance {
    /// Two aircraft with four cooling units each, three slots on days 1, 3
    /// and 5, a seven-day horizon, a three-day repair lead time and two spares
    /// per day. Aircraft 0 is critical before day 5.
    pub fn example() -> Self {
        let components = |prefix: &str| -> Vec<Component> {
            (0..4)
                .map(|c| Component {
                    name: format!("{}-cooling-{}", prefix, c),
                    install_day: 0,
                    failure: FailureModel::Linear { rate: 0.1 },
                })
                .collect()
        };
        let start_day = 0;
        let horizon = 7;
        let repair_lead_time = 3;
        SlotAssignmentInstance {
            name: "aircraft-cooling-units".to_string(),
            start_day,
            horizon,
            repair_lead_time,
            aircraft: vec![
                Aircraft { name: "AC-0".to_string(), components: components("AC-0"), allowed_slots: None },
                Aircraft { name: "AC-1".to_string(), components: components("AC-1"), allowed_slots: None },
            ],
            slots: [1, 3, 5].iter().map(|&day| Slot { day, capacity: 1, cost: 200.0 }).collect(),
            costs: CostParameters {
                fixed_replacement: 100.0,
                failure_penalty: 500.0,
                lease_per_day: 50.0,
                new_lease: 200.0,
            },
            spares_per_day: vec![2; (horizon + repair_lead_time) as usize],
            critical: vec![CriticalAircraft {
                aircraft: 0,
                risk_day: 5,
                groups: vec![vec![0, 1], vec![1, 2], vec![2, 3]],
            }],
            coverage: GroupCoverage::AtLeastOne,
        }
    }

    /// Every day on which leased parts are tracked: the horizon plus the repair lead time.
    pub fn days(&self) -> Range<i64> {
        self.start_day..self.start_day + self.horizon + self.repair_lead_time
    }

    /// Last day of the horizon, used to price postponed replacements.
    pub fn end_day(&self) -> i64 {
        self.start_day + self.horizon
    }

    pub fn slots_of(&self, aircraft: usize) -> Vec<usize> {
        match &self.aircraft[aircraft].allowed_slots {
            Some(slots) => slots.clone(),
            None => (0..self.slots.len()).collect(),
        }
    }

    pub fn spares_on(&self, day: i64) -> i32 {
        self.spares_per_day[(day - self.start_day) as usize]
    }

    pub fn num_components(&self) -> usize {
        self.aircraft.iter().map(|a| a.components.len()).sum()
    }

    /// Cost of replacing a component on `day`: fixed cost plus the expected
    /// failure penalty accumulated since installation.
    pub fn replacement_cost(&self, component: &Component, day: i64) -> (f64, f64) {
        let age = (day - component.install_day) as f64;
        let expected_failure = component.failure.probability(age) * self.costs.failure_penalty * age;
        (self.costs.fixed_replacement, expected_failure)
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon <= 0 {
            return invalid("horizon must be at least one day");
        }
        if self.repair_lead_time < 0 {
            return invalid("repair lead time cannot be negative");
        }
        if self.aircraft.is_empty() {
            return invalid("instance has no aircraft");
        }
        if self.slots.is_empty() {
            return invalid("instance has no maintenance slots");
        }
        check_cost(self.costs.fixed_replacement, "fixed replacement cost")?;
        check_cost(self.costs.failure_penalty, "failure penalty")?;
        check_cost(self.costs.lease_per_day, "daily lease cost")?;
        check_cost(self.costs.new_lease, "new lease cost")?;

        for (s, slot) in self.slots.iter().enumerate() {
            if slot.capacity < 0 {
                return invalid(format!("slot {} has negative capacity {}", s, slot.capacity));
            }
            if slot.day < self.start_day || slot.day >= self.end_day() {
                return invalid(format!("slot {} on day {} lies outside the horizon", s, slot.day));
            }
            check_cost(slot.cost, &format!("cost of slot {}", s))?;
        }

        for (a, aircraft) in self.aircraft.iter().enumerate() {
            if aircraft.components.is_empty() {
                return invalid(format!("aircraft {} has no components", aircraft.name));
            }
            if let Some(slots) = &aircraft.allowed_slots {
                if let Some(s) = slots.iter().find(|&&s| s >= self.slots.len()) {
                    return invalid(format!("aircraft {} references nonexistent slot {}", a, s));
                }
                let mut seen = BTreeSet::new();
                if let Some(s) = slots.iter().find(|&&s| !seen.insert(s)) {
                    return invalid(format!("aircraft {} lists slot {} twice", a, s));
                }
            }
            for component in &aircraft.components {
                component.failure.validate(&component.name)?;
                if component.install_day > self.end_day() {
                    return invalid(format!("component {} is installed after the horizon", component.name));
                }
            }
        }

        let days = (self.horizon + self.repair_lead_time) as usize;
        if self.spares_per_day.len() != days {
            return invalid(format!(
                "spares_per_day has {} entries, expected {} (horizon + repair lead time)",
                self.spares_per_day.len(),
                days
            ));
        }
        if self.spares_per_day.iter().any(|&s| s < 0) {
            return invalid("spare stock cannot be negative");
        }

        for critical in &self.critical {
            let Some(aircraft) = self.aircraft.get(critical.aircraft) else {
                return invalid(format!("critical entry references nonexistent aircraft {}", critical.aircraft));
            };
            for group in &critical.groups {
                if group.is_empty() {
                    return invalid(format!("aircraft {} has an empty reliability group", aircraft.name));
                }
                if let Some(c) = group.iter().find(|&&c| c >= aircraft.components.len()) {
                    return invalid(format!("aircraft {} has no component {}", aircraft.name, c));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_is_valid() {
        let instance = SlotAssignmentInstance::example();
        assert!(instance.validate().is_ok());
        assert_eq!(instance.days(), 0..10);
        assert_eq!(instance.num_components(), 8);
        assert_eq!(instance.slots_of(1), vec![0, 1, 2]);
    }

    #[test]
    fn test_replacement_cost_grows_with_age() {
        let instance = SlotAssignmentInstance::example();
        let component = &instance.aircraft[0].components[0];
        // day 3: p = 0.3, penalty 500 * 0.3 * 3
        let (fixed, expected) = instance.replacement_cost(component, 3);
        assert_eq!(fixed, 100.0);
        assert!((expected - 450.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_capacity_rejected() {
        let mut instance = SlotAssignmentInstance::example();
        instance.slots[1].capacity = -1;
        assert!(instance.validate().is_err());
    }

    #[test]
    fn test_nonexistent_references_rejected() {
        let mut instance = SlotAssignmentInstance::example();
        instance.aircraft[0].allowed_slots = Some(vec![0, 7]);
        assert!(instance.validate().is_err());

        let mut instance = SlotAssignmentInstance::example();
        instance.critical[0].aircraft = 9;
        assert!(instance.validate().is_err());

        let mut instance = SlotAssignmentInstance::example();
        instance.critical[0].groups.push(vec![4]);
        assert!(instance.validate().is_err());
    }

    #[test]
    fn test_duplicate_allowed_slot_rejected() {
        let mut instance = SlotAssignmentInstance::example();
        instance.aircraft[0].allowed_slots = Some(vec![0, 0]);
        assert!(matches!(instance.validate(), Err(crate::error::PlannerError::InvalidParameter(_))));

        instance.aircraft[0].allowed_slots = Some(vec![2, 0]);
        assert!(instance.validate().is_ok());
        assert_eq!(instance.slots_of(0), vec![2, 0]);
    }

    #[test]
    fn test_spare_vector_must_cover_days() {
        let mut instance = SlotAssignmentInstance::example();
        instance.spares_per_day.pop();
        assert!(instance.validate().is_err());
    }

    #[test]
    fn test_non_finite_cost_rejected() {
        let mut instance = SlotAssignmentInstance::example();
        instance.costs.failure_penalty = f64::NAN;
        assert!(instance.validate().is_err());
    }
}
