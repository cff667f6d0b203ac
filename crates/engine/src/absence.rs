//! Merges manual absence entries with absence-like calendar events.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crewplan_core::{
    AbsenceEntry, AbsenceInterval, AbsenceKind, AbsenceSource, CoreError, DateRange, EventTiming,
    ExternalEvent, PersonId,
};
use crewplan_storage::AllocationStore;

use crate::{EngineError, Planner};

const ABSENCE_KEYWORDS: &[(&str, AbsenceKind)] = &[
    ("holiday", AbsenceKind::Holiday),
    ("vacation", AbsenceKind::PaidTimeOff),
    ("pto", AbsenceKind::PaidTimeOff),
    ("time off", AbsenceKind::PaidTimeOff),
    ("day off", AbsenceKind::PaidTimeOff),
    ("out of office", AbsenceKind::PaidTimeOff),
    ("ooo", AbsenceKind::PaidTimeOff),
    ("sick", AbsenceKind::Other),
    ("leave", AbsenceKind::Other),
];

/// Absence kind for an event title, or `None` when the event is ordinary work.
/// Matches whole words, case-insensitively.
pub fn classify(title: &str) -> Option<AbsenceKind> {
    let words: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let padded = format!(" {} ", words.split_whitespace().collect::<Vec<_>>().join(" "));
    ABSENCE_KEYWORDS
        .iter()
        .find(|(keyword, _)| padded.contains(&format!(" {keyword} ")))
        .map(|(_, kind)| *kind)
}

/// Per-date intervals for one synced event.
///
/// All-day events yield `full_day_hours` on every covered date. Timed events
/// yield their elapsed hours, capped at `full_day_hours`, on the start date.
pub fn event_intervals(
    event: &ExternalEvent,
    full_day_hours: f64,
) -> Result<Vec<AbsenceInterval>, CoreError> {
    let Some(kind) = classify(&event.title) else {
        return Ok(Vec::new());
    };
    let interval = |date: NaiveDate, hours: f64, kind: AbsenceKind| AbsenceInterval {
        person_id: event.person_id,
        date,
        hours,
        kind,
        source: AbsenceSource::Calendar,
    };

    match &event.timing {
        EventTiming::AllDay { start, end } => Ok(DateRange::new(*start, *end)?
            .days()
            .map(|date| interval(date, full_day_hours, kind))
            .collect()),
        EventTiming::Timed { start, end } => {
            let elapsed = (*end - *start).num_minutes() as f64 / 60.0;
            if elapsed <= 0.0 {
                return Ok(Vec::new());
            }
            let hours = elapsed.min(full_day_hours);
            let kind = if hours < full_day_hours {
                AbsenceKind::PartialDay
            } else {
                kind
            };
            Ok(vec![interval(start.date(), hours, kind)])
        }
    }
}

/// One interval per `(person, date)`. Manual entries replace synced ones; within
/// a source the later entry replaces the earlier.
pub fn overlay(
    manual: &[AbsenceEntry],
    events: &[ExternalEvent],
    full_day_hours: f64,
) -> Result<Vec<AbsenceInterval>, CoreError> {
    let mut merged: BTreeMap<(PersonId, NaiveDate), AbsenceInterval> = BTreeMap::new();
    for event in events {
        for interval in event_intervals(event, full_day_hours)? {
            merged.insert((interval.person_id, interval.date), interval);
        }
    }
    for entry in manual {
        merged.insert(
            (entry.person_id, entry.date),
            AbsenceInterval {
                person_id: entry.person_id,
                date: entry.date,
                hours: entry.hours,
                kind: entry.kind,
                source: AbsenceSource::Manual,
            },
        );
    }
    Ok(merged.into_values().collect())
}

impl<S: AllocationStore> Planner<S> {
    pub fn record_absence(&mut self, entry: &AbsenceEntry) -> Result<(), EngineError> {
        crewplan_core::allocation::validate_hours(entry.hours)?;
        self.storage.insert_absence(entry)?;
        Ok(())
    }

    /// Store or refresh an event pulled from an external calendar.
    pub fn sync_external_event(&mut self, event: &ExternalEvent) -> Result<(), EngineError> {
        event.date_range()?;
        self.storage.upsert_external_event(event)?;
        Ok(())
    }

    /// Deduplicated absences for `person_ids` on dates inside `range`.
    pub fn absences(
        &self,
        person_ids: &[PersonId],
        range: DateRange,
    ) -> Result<Vec<AbsenceInterval>, EngineError> {
        let manual = self.storage.find_absences(person_ids, range)?;
        let events = self.storage.find_external_events(person_ids, range)?;
        let mut merged = overlay(&manual, &events, self.config.full_day_absence_hours)?;
        merged.retain(|a| range.contains(a.date));
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn event(person: PersonId, title: &str, timing: EventTiming) -> ExternalEvent {
        ExternalEvent {
            external_id: format!("evt-{title}"),
            person_id: person,
            title: title.into(),
            timing,
        }
    }

    #[test]
    fn classification_matches_whole_words() {
        assert_eq!(classify("Company Holiday"), Some(AbsenceKind::Holiday));
        assert_eq!(classify("PTO - Lisbon"), Some(AbsenceKind::PaidTimeOff));
        assert_eq!(classify("Out of Office"), Some(AbsenceKind::PaidTimeOff));
        assert_eq!(classify("sick"), Some(AbsenceKind::Other));
        assert_eq!(classify("Photoshoot"), None);
        assert_eq!(classify("Client review"), None);
    }

    #[test]
    fn all_day_event_covers_each_date() {
        let person = PersonId::new();
        let e = event(
            person,
            "Vacation",
            EventTiming::AllDay { start: d("2025-03-06"), end: d("2025-03-08") },
        );
        let intervals = event_intervals(&e, 8.0).unwrap();
        assert_eq!(intervals.len(), 3);
        assert!(intervals.iter().all(|i| i.hours == 8.0 && i.kind == AbsenceKind::PaidTimeOff));
    }

    #[test]
    fn timed_event_is_capped() {
        let person = PersonId::new();
        let short = event(
            person,
            "Sick",
            EventTiming::Timed {
                start: "2025-03-04T09:00:00".parse().unwrap(),
                end: "2025-03-04T12:30:00".parse().unwrap(),
            },
        );
        let intervals = event_intervals(&short, 8.0).unwrap();
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].hours, 3.5);
        assert_eq!(intervals[0].kind, AbsenceKind::PartialDay);

        let long = event(
            person,
            "Vacation",
            EventTiming::Timed {
                start: "2025-03-04T08:00:00".parse().unwrap(),
                end: "2025-03-04T20:00:00".parse().unwrap(),
            },
        );
        let intervals = event_intervals(&long, 8.0).unwrap();
        assert_eq!(intervals[0].hours, 8.0);
        assert_eq!(intervals[0].kind, AbsenceKind::PaidTimeOff);
    }

    #[test]
    fn manual_entry_wins_collision() {
        let person = PersonId::new();
        let synced = event(
            person,
            "Holiday",
            EventTiming::AllDay { start: d("2025-03-10"), end: d("2025-03-11") },
        );
        let manual = AbsenceEntry::new(person, d("2025-03-10"), 4.0, AbsenceKind::PartialDay).unwrap();

        let merged = overlay(&[manual], &[synced], 8.0).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].date, d("2025-03-10"));
        assert_eq!(merged[0].source, AbsenceSource::Manual);
        assert_eq!(merged[0].hours, 4.0);
        assert_eq!(merged[1].source, AbsenceSource::Calendar);
    }

    #[test]
    fn ordinary_events_are_ignored() {
        let person = PersonId::new();
        let meeting = event(
            person,
            "Standup",
            EventTiming::Timed {
                start: "2025-03-04T09:00:00".parse().unwrap(),
                end: "2025-03-04T09:15:00".parse().unwrap(),
            },
        );
        assert!(overlay(&[], &[meeting], 8.0).unwrap().is_empty());
    }
}
