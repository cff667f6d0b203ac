use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Hours worked on each day of the week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekdayHours {
    pub mon: f64,
    pub tue: f64,
    pub wed: f64,
    pub thu: f64,
    pub fri: f64,
    pub sat: f64,
    pub sun: f64,
}

impl WeekdayHours {
    /// Same hours Monday through Friday, weekends off.
    pub fn weekdays(hours: f64) -> Self {
        Self {
            mon: hours,
            tue: hours,
            wed: hours,
            thu: hours,
            fri: hours,
            sat: 0.0,
            sun: 0.0,
        }
    }

    pub fn hours_on(&self, weekday: Weekday) -> f64 {
        match weekday {
            Weekday::Mon => self.mon,
            Weekday::Tue => self.tue,
            Weekday::Wed => self.wed,
            Weekday::Thu => self.thu,
            Weekday::Fri => self.fri,
            Weekday::Sat => self.sat,
            Weekday::Sun => self.sun,
        }
    }

    pub fn weekly_total(&self) -> f64 {
        self.mon + self.tue + self.wed + self.thu + self.fri + self.sat + self.sun
    }

    fn values(&self) -> [f64; 7] {
        [self.mon, self.tue, self.wed, self.thu, self.fri, self.sat, self.sun]
    }
}

/// How much a person can work. Owned by the profile subsystem; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkSchedule {
    /// Flat weekly capacity spread over five working days.
    Weekly { weekly_hours: f64 },
    /// Explicit hours for every weekday, weekends included.
    Daily(WeekdayHours),
}

impl WorkSchedule {
    pub fn validate(&self) -> Result<(), CoreError> {
        let bad = match self {
            WorkSchedule::Weekly { weekly_hours } => !valid_capacity(*weekly_hours),
            WorkSchedule::Daily(days) => days.values().iter().any(|h| !valid_capacity(*h)),
        };
        if bad {
            return Err(CoreError::Validation(
                "schedule hours must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }

    pub fn weekly_total(&self) -> f64 {
        match self {
            WorkSchedule::Weekly { weekly_hours } => *weekly_hours,
            WorkSchedule::Daily(days) => days.weekly_total(),
        }
    }
}

fn valid_capacity(hours: f64) -> bool {
    hours.is_finite() && hours >= 0.0
}
