use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::DateRange;
use crate::error::CoreError;
use crate::ids::{AbsenceId, PersonId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbsenceKind {
    PaidTimeOff,
    Holiday,
    PartialDay,
    Other,
}

impl AbsenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaidTimeOff => "paid-time-off",
            Self::Holiday => "holiday",
            Self::PartialDay => "partial-day",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "paid-time-off" => Ok(Self::PaidTimeOff),
            "holiday" => Ok(Self::Holiday),
            "partial-day" => Ok(Self::PartialDay),
            "other" => Ok(Self::Other),
            _ => Err(CoreError::InvalidData(format!("unknown absence kind: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbsenceSource {
    Manual,
    Calendar,
}

/// A manually entered absence row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceEntry {
    pub id: AbsenceId,
    pub person_id: PersonId,
    pub date: NaiveDate,
    pub hours: f64,
    pub kind: AbsenceKind,
}

impl AbsenceEntry {
    pub fn new(
        person_id: PersonId,
        date: NaiveDate,
        hours: f64,
        kind: AbsenceKind,
    ) -> Result<Self, CoreError> {
        crate::allocation::validate_hours(hours)?;
        Ok(Self {
            id: AbsenceId::new(),
            person_id,
            date,
            hours,
            kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventTiming {
    /// Inclusive dates.
    AllDay { start: NaiveDate, end: NaiveDate },
    Timed { start: NaiveDateTime, end: NaiveDateTime },
}

/// An event synced from an external calendar. Only absence-like events
/// contribute to views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEvent {
    /// Identifier assigned by the calendar provider.
    pub external_id: String,
    pub person_id: PersonId,
    pub title: String,
    pub timing: EventTiming,
}

impl ExternalEvent {
    /// Dates the event touches.
    pub fn date_range(&self) -> Result<DateRange, CoreError> {
        match &self.timing {
            EventTiming::AllDay { start, end } => DateRange::new(*start, *end),
            EventTiming::Timed { start, end } => DateRange::new(start.date(), end.date()),
        }
    }
}

/// One (person, date) absence after both sources have been merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceInterval {
    pub person_id: PersonId,
    pub date: NaiveDate,
    pub hours: f64,
    pub kind: AbsenceKind,
    pub source: AbsenceSource,
}
