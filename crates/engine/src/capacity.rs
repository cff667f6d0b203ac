//! Available hours per person and how much of them is planned.

use chrono::Datelike;
use serde::Serialize;

use crewplan_core::{Allocation, DateRange, PersonId, WorkSchedule};
use crewplan_storage::AllocationStore;

use crate::{EngineError, Planner};

/// Maximum hours available over `range`.
///
/// An explicit per-weekday schedule is summed over every calendar date, weekends
/// included, since the schedule itself says which days are worked. A flat weekly
/// figure is spread over five working days.
pub fn max_capacity(schedule: &WorkSchedule, range: &DateRange) -> f64 {
    match schedule {
        WorkSchedule::Daily(hours) => range.days().map(|d| hours.hours_on(d.weekday())).sum(),
        WorkSchedule::Weekly { weekly_hours } => {
            weekly_hours / 5.0 * f64::from(range.working_days())
        }
    }
}

/// Planned hours for one person inside `range`, prorating records that cross its edges.
pub fn allocated_hours(allocations: &[Allocation], person_id: PersonId, range: &DateRange) -> f64 {
    allocations
        .iter()
        .filter(|a| a.person_id == person_id)
        .fold(0.0, |acc, a| acc + a.hours_within(range))
}

/// Percentage of capacity in use; 0 when there is no capacity.
pub fn utilization(allocated: f64, capacity: f64) -> f64 {
    if capacity <= 0.0 {
        return 0.0;
    }
    allocated / capacity * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Utilization {
    pub person_id: PersonId,
    pub range: DateRange,
    pub allocated_hours: f64,
    pub capacity_hours: f64,
    pub percent: f64,
}

impl Utilization {
    pub fn is_over_capacity(&self) -> bool {
        self.allocated_hours > self.capacity_hours
    }
}

impl<S: AllocationStore> Planner<S> {
    /// Stored schedule, or the configured flat weekly default.
    pub fn schedule_for(&self, person_id: PersonId) -> Result<WorkSchedule, EngineError> {
        Ok(self
            .storage
            .get_schedule(person_id)?
            .unwrap_or(WorkSchedule::Weekly {
                weekly_hours: self.config.default_weekly_capacity,
            }))
    }

    pub fn set_schedule(
        &mut self,
        person_id: PersonId,
        schedule: &WorkSchedule,
    ) -> Result<(), EngineError> {
        schedule.validate()?;
        self.storage.set_schedule(person_id, schedule)?;
        Ok(())
    }

    pub fn max_capacity(&self, person_id: PersonId, range: DateRange) -> Result<f64, EngineError> {
        Ok(max_capacity(&self.schedule_for(person_id)?, &range))
    }

    pub fn utilization(
        &self,
        person_id: PersonId,
        range: DateRange,
    ) -> Result<Utilization, EngineError> {
        let allocations = self.storage.find_in_range(&[person_id], range)?;
        let allocated = allocated_hours(&allocations, person_id, &range);
        let capacity = self.max_capacity(person_id, range)?;
        Ok(Utilization {
            person_id,
            range,
            allocated_hours: allocated,
            capacity_hours: capacity,
            percent: utilization(allocated, capacity),
        })
    }
}
