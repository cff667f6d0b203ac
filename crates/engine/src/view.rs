//! Calendar views at day, week and month resolution.
//!
//! A view is a grid of (person, column) cells built from one fetch of the
//! window's allocations and absences. Day and week columns are single dates;
//! month columns are whole weeks.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crewplan_core::{
    AbsenceInterval, AbsenceKind, Allocation, AllocationId, DateRange, PersonId, ProjectId,
    WorkSchedule, calendar::add_days,
};
use crewplan_storage::AllocationStore;

use crate::capacity::{max_capacity, utilization};
use crate::config::PlannerConfig;
use crate::grouping::{AllocationGroup, group};
use crate::{EngineError, Planner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Day,
    Week,
    Month,
}

impl Resolution {
    fn threshold(&self, config: &PlannerConfig) -> f64 {
        match self {
            Resolution::Day | Resolution::Week => config.daily_overallocation_threshold,
            Resolution::Month => config.weekly_overallocation_threshold,
        }
    }
}

/// Column ranges for a view anchored on `base`.
///
/// Day: the base date. Week: the seven dates of its Monday-anchored week.
/// Month: five whole weeks, from two weeks before the base week to two after.
pub fn columns(base: NaiveDate, resolution: Resolution) -> Result<Vec<DateRange>, EngineError> {
    match resolution {
        Resolution::Day => Ok(vec![DateRange::single(base)]),
        Resolution::Week => Ok(DateRange::week_of(base)?.days().map(DateRange::single).collect()),
        Resolution::Month => {
            let week = DateRange::week_of(base)?;
            (-2..=2)
                .map(|offset| -> Result<DateRange, EngineError> {
                    Ok(DateRange::week_of(add_days(week.start(), offset * 7)?)?)
                })
                .collect()
        }
    }
}

/// One allocation's contribution to a cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellEntry {
    pub allocation_id: AllocationId,
    pub project_id: ProjectId,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCell {
    pub person_id: PersonId,
    pub column: DateRange,
    pub entries: Vec<CellEntry>,
    pub total_hours: f64,
    pub capacity_hours: f64,
    pub utilization: f64,
    pub over_allocated: bool,
    /// Reported alongside work hours, never subtracted from them.
    pub absence_hours: f64,
    pub absence_kind: Option<AbsenceKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRow {
    pub person_id: PersonId,
    pub cells: Vec<CalendarCell>,
    pub groups: Vec<AllocationGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    pub resolution: Resolution,
    pub window: DateRange,
    pub columns: Vec<DateRange>,
    pub rows: Vec<PersonRow>,
}

impl CalendarView {
    pub fn row(&self, person_id: PersonId) -> Option<&PersonRow> {
        self.rows.iter().find(|r| r.person_id == person_id)
    }

    pub fn cell(&self, person_id: PersonId, column: usize) -> Option<&CalendarCell> {
        self.row(person_id).and_then(|r| r.cells.get(column))
    }
}

fn window_of(columns: &[DateRange]) -> Result<DateRange, EngineError> {
    match (columns.first(), columns.last()) {
        (Some(first), Some(last)) => Ok(DateRange::new(first.start(), last.end())?),
        _ => Err(crewplan_core::CoreError::Validation("view has no columns".into()).into()),
    }
}

/// Sum that stays `0.0` on an empty input instead of `-0.0`.
fn total(hours: impl Iterator<Item = f64>) -> f64 {
    hours.fold(0.0, |acc, h| acc + h)
}

fn build_cell(
    person_id: PersonId,
    column: DateRange,
    resolution: Resolution,
    allocations: &[&Allocation],
    absences: &[&AbsenceInterval],
    schedule: &WorkSchedule,
    config: &PlannerConfig,
) -> CalendarCell {
    // A single-date column takes the daily figure only on the record's counted
    // days; a week column takes the prorated share.
    let entries: Vec<CellEntry> = allocations
        .iter()
        .filter(|a| a.range.overlaps(&column))
        .map(|a| CellEntry {
            allocation_id: a.id,
            project_id: a.project_id,
            hours: a.hours_within(&column),
        })
        .filter(|e| e.hours > 0.0)
        .collect();
    let total_hours = total(entries.iter().map(|e| e.hours));

    let in_column: Vec<&&AbsenceInterval> =
        absences.iter().filter(|a| column.contains(a.date)).collect();
    let capacity_hours = max_capacity(schedule, &column);

    CalendarCell {
        person_id,
        column,
        entries,
        total_hours,
        capacity_hours,
        utilization: utilization(total_hours, capacity_hours),
        over_allocated: total_hours > resolution.threshold(config),
        absence_hours: total(in_column.iter().map(|a| a.hours)),
        absence_kind: in_column.first().map(|a| a.kind),
    }
}

/// Project already-fetched records onto the grid. Pure.
pub fn assemble(
    person_ids: &[PersonId],
    columns: Vec<DateRange>,
    resolution: Resolution,
    allocations: &[Allocation],
    absences: &[AbsenceInterval],
    schedules: &HashMap<PersonId, WorkSchedule>,
    config: &PlannerConfig,
) -> Result<CalendarView, EngineError> {
    let window = window_of(&columns)?;
    let fallback = WorkSchedule::Weekly {
        weekly_hours: config.default_weekly_capacity,
    };

    let rows = person_ids
        .iter()
        .map(|&person_id| {
            let mine: Vec<&Allocation> =
                allocations.iter().filter(|a| a.person_id == person_id).collect();
            let away: Vec<&AbsenceInterval> =
                absences.iter().filter(|a| a.person_id == person_id).collect();
            let schedule = schedules.get(&person_id).unwrap_or(&fallback);

            let cells = columns
                .iter()
                .map(|column| {
                    build_cell(person_id, *column, resolution, &mine, &away, schedule, config)
                })
                .collect();
            let owned: Vec<Allocation> = mine.into_iter().cloned().collect();
            PersonRow {
                person_id,
                cells,
                groups: group(&owned),
            }
        })
        .collect();

    Ok(CalendarView {
        resolution,
        window,
        columns,
        rows,
    })
}

impl<S: AllocationStore> Planner<S> {
    /// Build the grid for `person_ids` around `base`. Allocations and absences
    /// are fetched once for the whole window.
    pub fn build_view(
        &self,
        person_ids: &[PersonId],
        base: NaiveDate,
        resolution: Resolution,
    ) -> Result<CalendarView, EngineError> {
        let columns = columns(base, resolution)?;
        let window = window_of(&columns)?;
        debug!(?resolution, %window, people = person_ids.len(), "building view");

        let allocations = self.storage.find_in_range(person_ids, window)?;
        let absences = self.absences(person_ids, window)?;
        let mut schedules = HashMap::new();
        for &person_id in person_ids {
            schedules.insert(person_id, self.schedule_for(person_id)?);
        }

        assemble(
            person_ids,
            columns,
            resolution,
            &allocations,
            &absences,
            &schedules,
            &self.config,
        )
    }
}
