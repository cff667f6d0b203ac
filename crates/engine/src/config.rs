use serde::{Deserialize, Serialize};

pub const DEFAULT_DAILY_THRESHOLD: f64 = 8.0;
pub const DEFAULT_WEEKLY_THRESHOLD: f64 = 40.0;
pub const DEFAULT_WEEKLY_CAPACITY: f64 = 40.0;
pub const DEFAULT_FULL_DAY_ABSENCE_HOURS: f64 = 8.0;

/// Tunables for view aggregation and capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlannerConfig {
    /// A day cell is over-allocated when its total is strictly above this.
    pub daily_overallocation_threshold: f64,
    /// A week cell (month resolution) is over-allocated above this.
    pub weekly_overallocation_threshold: f64,
    /// Capacity for people with no stored schedule.
    pub default_weekly_capacity: f64,
    /// Hours recorded for an all-day calendar absence, and the cap for timed ones.
    pub full_day_absence_hours: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            daily_overallocation_threshold: DEFAULT_DAILY_THRESHOLD,
            weekly_overallocation_threshold: DEFAULT_WEEKLY_THRESHOLD,
            default_weekly_capacity: DEFAULT_WEEKLY_CAPACITY,
            full_day_absence_hours: DEFAULT_FULL_DAY_ABSENCE_HOURS,
        }
    }
}
