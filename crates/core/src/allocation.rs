use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::DateRange;
use crate::error::CoreError;
use crate::ids::*;

/// A stored plan: one person on one project for an inclusive date range.
///
/// `hours` is always hours per counted day of `range` (see [`DateRange::counted_days`]).
/// Totals are derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub id: AllocationId,
    pub person_id: PersonId,
    pub project_id: ProjectId,
    pub phase_id: Option<PhaseId>,
    pub range: DateRange,
    pub hours: f64,
    pub billable: bool,
    pub notes: Option<String>,
    pub created_by: Option<ActorId>,
}

impl Allocation {
    pub fn from_candidate(id: AllocationId, candidate: NewAllocation) -> Self {
        Self {
            id,
            person_id: candidate.person_id,
            project_id: candidate.project_id,
            phase_id: candidate.phase_id,
            range: candidate.range,
            hours: candidate.hours,
            billable: candidate.billable,
            notes: candidate.notes,
            created_by: candidate.created_by,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.range.start()
    }

    pub fn end(&self) -> NaiveDate {
        self.range.end()
    }

    pub fn is_single_day(&self) -> bool {
        self.range.is_single_day()
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.range.contains(date)
    }

    pub fn total_hours(&self) -> f64 {
        self.hours * f64::from(self.range.counted_days())
    }

    /// Share of the total that falls inside `window`, prorated over the days the
    /// allocation counts (working days, or calendar days for weekend-only ranges).
    pub fn hours_within(&self, window: &DateRange) -> f64 {
        let Some(overlap) = self.range.intersect(window) else {
            return 0.0;
        };
        let inside = if self.range.working_days() > 0 {
            overlap.working_days()
        } else {
            overlap.calendar_days()
        };
        self.hours * f64::from(inside)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_hours(self.hours)
    }
}

/// A validated write candidate that has no identity yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAllocation {
    pub person_id: PersonId,
    pub project_id: ProjectId,
    pub phase_id: Option<PhaseId>,
    pub range: DateRange,
    pub hours: f64,
    pub billable: bool,
    pub notes: Option<String>,
    pub created_by: Option<ActorId>,
}

impl NewAllocation {
    pub fn new(
        person_id: PersonId,
        project_id: ProjectId,
        range: DateRange,
        hours: f64,
    ) -> Result<Self, CoreError> {
        validate_hours(hours)?;
        Ok(Self {
            person_id,
            project_id,
            phase_id: None,
            range,
            hours,
            billable: true,
            notes: None,
            created_by: None,
        })
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = normalize_notes(Some(notes.into()));
        self
    }

    pub fn with_phase(mut self, phase_id: PhaseId) -> Self {
        self.phase_id = Some(phase_id);
        self
    }

    pub fn with_billable(mut self, billable: bool) -> Self {
        self.billable = billable;
        self
    }

    pub fn created_by(mut self, actor_id: ActorId) -> Self {
        self.created_by = Some(actor_id);
        self
    }

    /// Same candidate narrowed to a single date.
    pub fn on_day(&self, date: NaiveDate) -> Self {
        Self {
            range: DateRange::single(date),
            ..self.clone()
        }
    }

    pub fn total_hours(&self) -> f64 {
        self.hours * f64::from(self.range.counted_days())
    }
}

pub fn validate_hours(hours: f64) -> Result<(), CoreError> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(CoreError::Validation(format!(
            "hours must be a positive number, got {hours}"
        )));
    }
    Ok(())
}

/// Blank notes are stored as absent.
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn allocation(start: &str, end: &str, hours: f64) -> Allocation {
        let range = DateRange::new(d(start), d(end)).unwrap();
        let candidate = NewAllocation::new(PersonId::new(), ProjectId::new(), range, hours).unwrap();
        Allocation::from_candidate(AllocationId::new(), candidate)
    }

    #[test]
    fn totals_count_working_days_only() {
        // Thursday through the following Tuesday: 4 working days
        let a = allocation("2025-03-06", "2025-03-11", 6.0);
        assert_eq!(a.total_hours(), 24.0);
    }

    #[test]
    fn weekend_only_allocation_still_carries_hours() {
        let a = allocation("2025-03-08", "2025-03-09", 4.0);
        assert_eq!(a.total_hours(), 8.0);
        let saturday = DateRange::single(d("2025-03-08"));
        assert_eq!(a.hours_within(&saturday), 4.0);
    }

    #[test]
    fn hours_within_prorates_by_working_days() {
        let a = allocation("2025-03-03", "2025-03-07", 8.0);
        let week = DateRange::week_of(d("2025-03-03")).unwrap();
        assert_eq!(a.hours_within(&week), 40.0);

        let tail = DateRange::new(d("2025-03-06"), d("2025-03-09")).unwrap();
        assert_eq!(a.hours_within(&tail), 16.0);

        let outside = DateRange::single(d("2025-03-10"));
        assert_eq!(a.hours_within(&outside), 0.0);
    }

    #[test]
    fn rejects_non_positive_hours() {
        let range = DateRange::single(d("2025-03-03"));
        for hours in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = NewAllocation::new(PersonId::new(), ProjectId::new(), range, hours);
            assert!(matches!(result, Err(CoreError::Validation(_))), "hours {hours} accepted");
        }
    }

    #[test]
    fn blank_notes_are_dropped() {
        let range = DateRange::single(d("2025-03-03"));
        let candidate = NewAllocation::new(PersonId::new(), ProjectId::new(), range, 2.0)
            .unwrap()
            .with_notes("   ");
        assert_eq!(candidate.notes, None);
    }
}
