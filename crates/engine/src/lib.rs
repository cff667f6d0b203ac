pub mod absence;
pub mod capacity;
pub mod config;
pub mod error;
pub mod grouping;
pub mod merge;
pub mod repeat;
pub mod request;
pub mod view;

pub use capacity::Utilization;
pub use config::PlannerConfig;
pub use error::EngineError;
pub use grouping::AllocationGroup;
pub use merge::MergeScope;
pub use request::{AllocationPatch, CreateAllocation, GroupPatch, ListQuery};
pub use view::{CalendarCell, CalendarView, CellEntry, PersonRow, Resolution};

use tracing::{info, warn};

use crewplan_core::{Allocation, AllocationId, CoreError};
use crewplan_storage::{AllocationStore, SqliteStorage, StorageError};

/// Resource planner over an allocation store.
///
/// Every write that touches more than one record runs in a single store
/// transaction, so readers never observe a partial merge, repeat or group edit.
pub struct Planner<S = SqliteStorage> {
    storage: S,
    config: PlannerConfig,
}

impl<S: AllocationStore> Planner<S> {
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, PlannerConfig::default())
    }

    pub fn with_config(storage: S, config: PlannerConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Run `f` between BEGIN and COMMIT; any error rolls the whole body back.
    pub(crate) fn in_transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        self.storage.begin()?;
        match f(self) {
            Ok(value) => {
                self.storage.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.storage.rollback() {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    pub(crate) fn require_allocation(&self, id: AllocationId) -> Result<Allocation, EngineError> {
        self.storage
            .get_allocation(id)?
            .ok_or_else(|| EngineError::AllocationNotFound(id.to_string()))
    }

    // ========================================================================
    // Typed Commands
    // ========================================================================

    pub fn get_allocation(&self, id: AllocationId) -> Result<Option<Allocation>, EngineError> {
        Ok(self.storage.get_allocation(id)?)
    }

    /// Records overlapping the query window, optionally narrowed to one person
    /// and/or project.
    pub fn list_allocations(&self, query: &ListQuery) -> Result<Vec<Allocation>, EngineError> {
        let range = query.range()?;
        let mut found = match query.person_id {
            Some(person_id) => self.storage.find_in_range(&[person_id], range)?,
            None => self.storage.find_all_in_range(range)?,
        };
        if let Some(project_id) = query.project_id {
            found.retain(|a| a.project_id == project_id);
        }
        Ok(found)
    }

    pub fn delete_allocation(&mut self, id: AllocationId) -> Result<(), EngineError> {
        match self.storage.delete_allocation(id) {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound(_)) => Err(EngineError::AllocationNotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `patch` to every record of a bar. Fails without writing anything
    /// when any id is unknown.
    pub fn update_group(
        &mut self,
        ids: &[AllocationId],
        patch: &GroupPatch,
    ) -> Result<Vec<Allocation>, EngineError> {
        if ids.is_empty() {
            return Err(CoreError::Validation("group update needs at least one id".into()).into());
        }
        let updated = self.in_transaction(|p| {
            let mut updated = Vec::with_capacity(ids.len());
            for &id in ids {
                let next = patch.apply(&p.require_allocation(id)?)?;
                p.storage.update_allocation(&next)?;
                updated.push(next);
            }
            Ok(updated)
        })?;
        info!(records = updated.len(), "updated allocation group");
        Ok(updated)
    }

    /// Delete every record of a bar, or none of them.
    pub fn delete_group(&mut self, ids: &[AllocationId]) -> Result<usize, EngineError> {
        if ids.is_empty() {
            return Err(CoreError::Validation("group delete needs at least one id".into()).into());
        }
        let removed = self.in_transaction(|p| {
            for &id in ids {
                p.require_allocation(id)?;
            }
            Ok(p.storage.delete_allocations(ids)?)
        })?;
        info!(removed, "deleted allocation group");
        Ok(removed)
    }
}
