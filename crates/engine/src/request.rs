//! Request records accepted by the planner's write and list surface.
//!
//! Field names are camelCase on the wire and dates are ISO calendar dates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crewplan_core::{
    ActorId, Allocation, CoreError, DateRange, NewAllocation, PersonId, PhaseId, ProjectId,
    allocation::{normalize_notes, validate_hours},
};

fn default_billable() -> bool {
    true
}

/// Create one allocation, or with `expand_to_week` one single-day record per
/// working day of the week containing `start_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAllocation {
    pub person_id: PersonId,
    pub project_id: ProjectId,
    pub phase_id: Option<PhaseId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hours: f64,
    #[serde(default = "default_billable")]
    pub billable: bool,
    pub notes: Option<String>,
    pub actor_id: Option<ActorId>,
    #[serde(default)]
    pub expand_to_week: bool,
}

impl CreateAllocation {
    pub fn new(
        person_id: PersonId,
        project_id: ProjectId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        hours: f64,
    ) -> Self {
        Self {
            person_id,
            project_id,
            phase_id: None,
            start_date,
            end_date,
            hours,
            billable: true,
            notes: None,
            actor_id: None,
            expand_to_week: false,
        }
    }

    /// Validate and convert. With `expand_to_week` the range becomes Monday
    /// through Friday of the start date's week.
    pub fn into_candidate(self) -> Result<NewAllocation, CoreError> {
        let range = DateRange::new(self.start_date, self.end_date)?;
        let range = if self.expand_to_week {
            DateRange::work_week_of(self.start_date)?
        } else {
            range
        };
        validate_hours(self.hours)?;
        Ok(NewAllocation {
            person_id: self.person_id,
            project_id: self.project_id,
            phase_id: self.phase_id,
            range,
            hours: self.hours,
            billable: self.billable,
            notes: normalize_notes(self.notes),
            created_by: self.actor_id,
        })
    }
}

/// Edit of a single record. Absent fields are left unchanged; blank notes clear them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllocationPatch {
    pub project_id: Option<ProjectId>,
    pub phase_id: Option<PhaseId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub hours: Option<f64>,
    pub billable: Option<bool>,
    pub notes: Option<String>,
}

impl AllocationPatch {
    pub fn apply(&self, current: &Allocation) -> Result<Allocation, CoreError> {
        let mut next = current.clone();
        if let Some(project_id) = self.project_id {
            next.project_id = project_id;
        }
        if let Some(phase_id) = self.phase_id {
            next.phase_id = Some(phase_id);
        }
        if self.start_date.is_some() || self.end_date.is_some() {
            next.range = DateRange::new(
                self.start_date.unwrap_or(current.start()),
                self.end_date.unwrap_or(current.end()),
            )?;
        }
        if let Some(hours) = self.hours {
            validate_hours(hours)?;
            next.hours = hours;
        }
        if let Some(billable) = self.billable {
            next.billable = billable;
        }
        if let Some(notes) = &self.notes {
            next.notes = normalize_notes(Some(notes.clone()));
        }
        Ok(next)
    }

    /// True when the edit can move the record onto another record's coverage.
    pub fn touches_coverage(&self) -> bool {
        self.project_id.is_some() || self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Edit applied to every member of a visual bar at once. Only fields that
/// cannot break coverage uniqueness are editable this way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupPatch {
    pub phase_id: Option<PhaseId>,
    pub hours: Option<f64>,
    pub billable: Option<bool>,
    pub notes: Option<String>,
}

impl GroupPatch {
    pub fn apply(&self, current: &Allocation) -> Result<Allocation, CoreError> {
        AllocationPatch {
            phase_id: self.phase_id,
            hours: self.hours,
            billable: self.billable,
            notes: self.notes.clone(),
            ..Default::default()
        }
        .apply(current)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub person_id: Option<PersonId>,
    pub project_id: Option<ProjectId>,
}

impl ListQuery {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            person_id: None,
            project_id: None,
        }
    }

    pub fn range(&self) -> Result<DateRange, CoreError> {
        DateRange::new(self.start_date, self.end_date)
    }
}
