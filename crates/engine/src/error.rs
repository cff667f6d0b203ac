use crewplan_core::{CoreError, PersonId, ProjectId};
use crewplan_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("allocation not found: {0}")]
    AllocationNotFound(String),

    #[error("overlapping allocations for person {person_id} on project {project_id}")]
    CoverageConflict {
        person_id: PersonId,
        project_id: ProjectId,
    },
}

impl EngineError {
    /// True for errors the caller can fix by changing the request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::Core(CoreError::Validation(_))
                | EngineError::Storage(StorageError::Core(CoreError::Validation(_)))
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::AllocationNotFound(_) | EngineError::Storage(StorageError::NotFound(_))
        )
    }
}
