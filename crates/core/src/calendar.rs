//! Day-granular calendar arithmetic.
//!
//! Every date here is a plain calendar date with no time of day and no zone.
//! Working days are Monday through Friday.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Shift a date by a signed number of days.
pub fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate, CoreError> {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.ok_or_else(|| {
        CoreError::InvalidData(format!("{date} shifted by {days} days is out of range"))
    })
}

/// The first working day strictly after `date`. A Friday is followed by the next Monday.
pub fn next_working_day(date: NaiveDate) -> Result<NaiveDate, CoreError> {
    let mut next = add_days(date, 1)?;
    while !is_working_day(next) {
        next = add_days(next, 1)?;
    }
    Ok(next)
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> Result<NaiveDate, CoreError> {
    add_days(date, -i64::from(date.weekday().num_days_from_monday()))
}

/// Inclusive range of calendar dates. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawRange> for DateRange {
    type Error = CoreError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::Validation(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    /// Monday through Sunday of the week containing `date`.
    pub fn week_of(date: NaiveDate) -> Result<Self, CoreError> {
        let monday = week_start(date)?;
        Ok(Self { start: monday, end: add_days(monday, 6)? })
    }

    /// Monday through Friday of the week containing `date`.
    pub fn work_week_of(date: NaiveDate) -> Result<Self, CoreError> {
        let monday = week_start(date)?;
        Ok(Self { start: monday, end: add_days(monday, 4)? })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Standard closed-interval overlap test.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(DateRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Grow by `days` on each side.
    pub fn widen(&self, days: i64) -> Result<DateRange, CoreError> {
        DateRange::new(add_days(self.start, -days)?, add_days(self.end, days)?)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn calendar_days(&self) -> u32 {
        (self.end - self.start).num_days() as u32 + 1
    }

    pub fn working_days(&self) -> u32 {
        self.days().filter(|d| is_working_day(*d)).count() as u32
    }

    /// Days that carry hours: the working days, or every calendar day when the
    /// range holds no working day at all (a weekend-only assignment).
    pub fn counted_days(&self) -> u32 {
        match self.working_days() {
            0 => self.calendar_days(),
            n => n,
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
