use crewplan_core::{
    AbsenceEntry, Allocation, AllocationId, DateRange, ExternalEvent, PersonId, ProjectId,
    WorkSchedule,
};

use crate::error::StorageError;

/// Filtered read/write surface over allocation records and the inputs views
/// need alongside them. Range predicates use the closed-interval overlap test
/// `a.start <= range.end AND a.end >= range.start`; nothing here merges or
/// aggregates.
///
/// Transactions are explicit: callers bracket multi-record writes with
/// [`begin`](Self::begin) and [`commit`](Self::commit) or
/// [`rollback`](Self::rollback). Transactions do not nest.
pub trait AllocationStore {
    fn begin(&mut self) -> Result<(), StorageError>;

    fn commit(&mut self) -> Result<(), StorageError>;

    fn rollback(&mut self) -> Result<(), StorageError>;

    // ------------------------------------------------------------------------
    // Allocations
    // ------------------------------------------------------------------------

    fn get_allocation(&self, id: AllocationId) -> Result<Option<Allocation>, StorageError>;

    fn find_overlapping(
        &self,
        person_id: PersonId,
        project_id: ProjectId,
        range: DateRange,
    ) -> Result<Vec<Allocation>, StorageError>;

    fn find_in_range(
        &self,
        person_ids: &[PersonId],
        range: DateRange,
    ) -> Result<Vec<Allocation>, StorageError>;

    /// Every person's allocations overlapping `range`.
    fn find_all_in_range(&self, range: DateRange) -> Result<Vec<Allocation>, StorageError>;

    /// All records for one person and project, ordered by start date.
    fn find_for_pair(
        &self,
        person_id: PersonId,
        project_id: ProjectId,
    ) -> Result<Vec<Allocation>, StorageError>;

    fn insert_allocation(&mut self, allocation: &Allocation) -> Result<(), StorageError>;

    /// Fails with `NotFound` when no record has this id.
    fn update_allocation(&mut self, allocation: &Allocation) -> Result<(), StorageError>;

    /// Fails with `NotFound` when no record has this id.
    fn delete_allocation(&mut self, id: AllocationId) -> Result<(), StorageError>;

    /// Returns the number of rows removed; unknown ids are ignored.
    fn delete_allocations(&mut self, ids: &[AllocationId]) -> Result<usize, StorageError>;

    // ------------------------------------------------------------------------
    // Schedules and absences
    // ------------------------------------------------------------------------

    fn get_schedule(&self, person_id: PersonId) -> Result<Option<WorkSchedule>, StorageError>;

    fn set_schedule(
        &mut self,
        person_id: PersonId,
        schedule: &WorkSchedule,
    ) -> Result<(), StorageError>;

    fn insert_absence(&mut self, entry: &AbsenceEntry) -> Result<(), StorageError>;

    fn find_absences(
        &self,
        person_ids: &[PersonId],
        range: DateRange,
    ) -> Result<Vec<AbsenceEntry>, StorageError>;

    /// Insert or replace by `(person_id, external_id)`.
    fn upsert_external_event(&mut self, event: &ExternalEvent) -> Result<(), StorageError>;

    fn find_external_events(
        &self,
        person_ids: &[PersonId],
        range: DateRange,
    ) -> Result<Vec<ExternalEvent>, StorageError>;
}
