use chrono::NaiveDate;
use tempfile::TempDir;

use crewplan_core::{ActorId, Allocation, DateRange, NewAllocation, PersonId, ProjectId};
use crewplan_engine::{CreateAllocation, Planner, PlannerConfig};
use crewplan_storage::{AllocationStore, SqliteStorage, StorageError};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Parse an ISO date.
pub fn date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    s.parse()
}

/// Route engine logs to the test writer. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A planner over a fresh database, plus the actor used for repeat writes.
pub struct TestPlanner {
    pub planner: Planner<SqliteStorage>,
    pub actor_id: ActorId,
    dir: Option<TempDir>,
}

impl TestPlanner {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_config(PlannerConfig::default())
    }

    pub fn with_config(config: PlannerConfig) -> Result<Self, StorageError> {
        init_tracing();
        Ok(Self {
            planner: Planner::with_config(SqliteStorage::open_in_memory()?, config),
            actor_id: ActorId::new(),
            dir: None,
        })
    }

    /// A planner backed by a database file in a temporary directory.
    pub fn on_disk() -> TestResult<Self> {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let storage = SqliteStorage::open(&db_path(&dir)?)?;
        Ok(Self {
            planner: Planner::new(storage),
            actor_id: ActorId::new(),
            dir: Some(dir),
        })
    }

    /// Close and reopen the on-disk database.
    pub fn reopen(self) -> TestResult<Self> {
        let dir = self.dir.ok_or("reopen needs an on-disk planner")?;
        drop(self.planner);
        let storage = SqliteStorage::open(&db_path(&dir)?)?;
        Ok(Self {
            planner: Planner::new(storage),
            actor_id: self.actor_id,
            dir: Some(dir),
        })
    }

    /// Ad hoc create-or-merge over `start..=end`.
    pub fn allocate(
        &mut self,
        person_id: PersonId,
        project_id: ProjectId,
        start: &str,
        end: &str,
        hours: f64,
    ) -> TestResult<Allocation> {
        let range = DateRange::new(date(start)?, date(end)?)?;
        let candidate = NewAllocation::new(person_id, project_id, range, hours)?;
        Ok(self.planner.upsert_allocation(candidate)?)
    }

    /// Create request with `expand_to_week` set, for the week containing `day`.
    pub fn allocate_week(
        &mut self,
        person_id: PersonId,
        project_id: ProjectId,
        day: &str,
        hours: f64,
    ) -> TestResult<Vec<Allocation>> {
        let day = date(day)?;
        let mut request = CreateAllocation::new(person_id, project_id, day, day, hours);
        request.expand_to_week = true;
        Ok(self.planner.create_allocation(request)?)
    }

    /// Every stored record of the pair, ordered by start date.
    pub fn pair_records(
        &self,
        person_id: PersonId,
        project_id: ProjectId,
    ) -> TestResult<Vec<Allocation>> {
        Ok(self.planner.storage().find_for_pair(person_id, project_id)?)
    }
}

fn db_path(dir: &TempDir) -> TestResult<String> {
    let path = dir.path().join("plan.db");
    Ok(path.to_str().ok_or("temp path is not utf-8")?.to_string())
}
