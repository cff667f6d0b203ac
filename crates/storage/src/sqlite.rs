use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};

use crewplan_core::{
    AbsenceEntry, AbsenceKind, Allocation, DateRange, EventTiming, ExternalEvent, WorkSchedule,
    ids::*,
};

use crate::error::StorageError;
use crate::traits::AllocationStore;

const ALLOCATION_COLUMNS: &str = "allocation_id, person_id, project_id, phase_id, start_date, end_date, hours, billable, notes, created_by";

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn to_id16(v: Vec<u8>, label: &str) -> Result<[u8; 16], StorageError> {
    to_array::<16>(v, label)
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn query_allocations(
        &self,
        sql: &str,
        values: Vec<Value>,
    ) -> Result<Vec<Allocation>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(AllocationRow {
                allocation_id: row.get(0)?,
                person_id: row.get(1)?,
                project_id: row.get(2)?,
                phase_id: row.get(3)?,
                start_date: row.get(4)?,
                end_date: row.get(5)?,
                hours: row.get(6)?,
                billable: row.get(7)?,
                notes: row.get(8)?,
                created_by: row.get(9)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.into_allocation()?);
        }
        Ok(result)
    }
}

struct AllocationRow {
    allocation_id: Vec<u8>,
    person_id: Vec<u8>,
    project_id: Vec<u8>,
    phase_id: Option<Vec<u8>>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    hours: f64,
    billable: bool,
    notes: Option<String>,
    created_by: Option<Vec<u8>>,
}

impl AllocationRow {
    fn into_allocation(self) -> Result<Allocation, StorageError> {
        let phase_id = match self.phase_id {
            Some(bytes) => Some(PhaseId::from_bytes(to_id16(bytes, "phase_id")?)),
            None => None,
        };
        let created_by = match self.created_by {
            Some(bytes) => Some(ActorId::from_bytes(to_id16(bytes, "created_by")?)),
            None => None,
        };
        Ok(Allocation {
            id: AllocationId::from_bytes(to_id16(self.allocation_id, "allocation_id")?),
            person_id: PersonId::from_bytes(to_id16(self.person_id, "person_id")?),
            project_id: ProjectId::from_bytes(to_id16(self.project_id, "project_id")?),
            phase_id,
            range: DateRange::new(self.start_date, self.end_date)?,
            hours: self.hours,
            billable: self.billable,
            notes: self.notes,
            created_by,
        })
    }
}

/// `?1, ?2, ...` for an IN list starting at parameter `first`.
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn blob(bytes: &[u8; 16]) -> Value {
    Value::Blob(bytes.to_vec())
}

fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}

/// Person ids followed by the range bounds, matching `person_range_filter`.
fn person_range_values(person_ids: &[PersonId], range: DateRange) -> Vec<Value> {
    let mut values: Vec<Value> = person_ids.iter().map(|p| blob(p.as_bytes())).collect();
    values.push(date_value(range.end()));
    values.push(date_value(range.start()));
    values
}

fn person_range_filter(person_ids: &[PersonId], start_col: &str, end_col: &str) -> String {
    let n = person_ids.len();
    format!(
        "person_id IN ({}) AND {start_col} <= ?{} AND {end_col} >= ?{}",
        placeholders(1, n),
        n + 1,
        n + 2
    )
}

fn map_constraint(err: rusqlite::Error, what: String) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(what)
        }
        other => StorageError::Sqlite(other),
    }
}

impl AllocationStore for SqliteStorage {
    fn begin(&mut self) -> Result<(), StorageError> {
        // IMMEDIATE takes the write lock up front so concurrent writers serialize.
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn get_allocation(&self, id: AllocationId) -> Result<Option<Allocation>, StorageError> {
        let sql = format!("SELECT {ALLOCATION_COLUMNS} FROM allocations WHERE allocation_id = ?1");
        let mut found = self.query_allocations(&sql, vec![blob(id.as_bytes())])?;
        Ok(found.pop())
    }

    fn find_overlapping(
        &self,
        person_id: PersonId,
        project_id: ProjectId,
        range: DateRange,
    ) -> Result<Vec<Allocation>, StorageError> {
        let sql = format!(
            "SELECT {ALLOCATION_COLUMNS} FROM allocations
             WHERE person_id = ?1 AND project_id = ?2 AND start_date <= ?3 AND end_date >= ?4
             ORDER BY start_date, allocation_id"
        );
        self.query_allocations(
            &sql,
            vec![
                blob(person_id.as_bytes()),
                blob(project_id.as_bytes()),
                date_value(range.end()),
                date_value(range.start()),
            ],
        )
    }

    fn find_in_range(
        &self,
        person_ids: &[PersonId],
        range: DateRange,
    ) -> Result<Vec<Allocation>, StorageError> {
        if person_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {ALLOCATION_COLUMNS} FROM allocations WHERE {} ORDER BY person_id, start_date, allocation_id",
            person_range_filter(person_ids, "start_date", "end_date")
        );
        self.query_allocations(&sql, person_range_values(person_ids, range))
    }

    fn find_all_in_range(&self, range: DateRange) -> Result<Vec<Allocation>, StorageError> {
        let sql = format!(
            "SELECT {ALLOCATION_COLUMNS} FROM allocations
             WHERE start_date <= ?1 AND end_date >= ?2
             ORDER BY person_id, start_date, allocation_id"
        );
        self.query_allocations(&sql, vec![date_value(range.end()), date_value(range.start())])
    }

    fn find_for_pair(
        &self,
        person_id: PersonId,
        project_id: ProjectId,
    ) -> Result<Vec<Allocation>, StorageError> {
        let sql = format!(
            "SELECT {ALLOCATION_COLUMNS} FROM allocations
             WHERE person_id = ?1 AND project_id = ?2
             ORDER BY start_date, allocation_id"
        );
        self.query_allocations(
            &sql,
            vec![blob(person_id.as_bytes()), blob(project_id.as_bytes())],
        )
    }

    fn insert_allocation(&mut self, allocation: &Allocation) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT INTO allocations (allocation_id, person_id, project_id, phase_id, start_date, end_date, hours, billable, notes, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    allocation.id.as_bytes().as_slice(),
                    allocation.person_id.as_bytes().as_slice(),
                    allocation.project_id.as_bytes().as_slice(),
                    allocation.phase_id.as_ref().map(|p| p.as_bytes().as_slice()),
                    allocation.start(),
                    allocation.end(),
                    allocation.hours,
                    allocation.billable,
                    allocation.notes,
                    allocation.created_by.as_ref().map(|a| a.as_bytes().as_slice()),
                ],
            )
            .map_err(|e| map_constraint(e, format!("allocation {}", allocation.id)))?;
        Ok(())
    }

    fn update_allocation(&mut self, allocation: &Allocation) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "UPDATE allocations SET person_id = ?2, project_id = ?3, phase_id = ?4, start_date = ?5, end_date = ?6,
                 hours = ?7, billable = ?8, notes = ?9, created_by = ?10
                 WHERE allocation_id = ?1",
                params![
                    allocation.id.as_bytes().as_slice(),
                    allocation.person_id.as_bytes().as_slice(),
                    allocation.project_id.as_bytes().as_slice(),
                    allocation.phase_id.as_ref().map(|p| p.as_bytes().as_slice()),
                    allocation.start(),
                    allocation.end(),
                    allocation.hours,
                    allocation.billable,
                    allocation.notes,
                    allocation.created_by.as_ref().map(|a| a.as_bytes().as_slice()),
                ],
            )
            .map_err(|e| map_constraint(e, format!("allocation {}", allocation.id)))?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("allocation {}", allocation.id)));
        }
        Ok(())
    }

    fn delete_allocation(&mut self, id: AllocationId) -> Result<(), StorageError> {
        let changed = self.conn.execute(
            "DELETE FROM allocations WHERE allocation_id = ?1",
            params![id.as_bytes().as_slice()],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("allocation {id}")));
        }
        Ok(())
    }

    fn delete_allocations(&mut self, ids: &[AllocationId]) -> Result<usize, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM allocations WHERE allocation_id IN ({})",
            placeholders(1, ids.len())
        );
        let values: Vec<Value> = ids.iter().map(|id| blob(id.as_bytes())).collect();
        let removed = self.conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(removed)
    }

    fn get_schedule(&self, person_id: PersonId) -> Result<Option<WorkSchedule>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT schedule FROM work_schedules WHERE person_id = ?1")?;
        let mut rows = stmt.query_map(params![person_id.as_bytes().as_slice()], |row| {
            row.get::<_, Vec<u8>>(0)
        })?;

        match rows.next() {
            Some(Ok(bytes)) => {
                let schedule = rmp_serde::from_slice(&bytes)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(schedule))
            }
            Some(Err(e)) => Err(StorageError::Sqlite(e)),
            None => Ok(None),
        }
    }

    fn set_schedule(
        &mut self,
        person_id: PersonId,
        schedule: &WorkSchedule,
    ) -> Result<(), StorageError> {
        let bytes =
            rmp_serde::to_vec(schedule).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO work_schedules (person_id, schedule) VALUES (?1, ?2)
             ON CONFLICT(person_id) DO UPDATE SET schedule = excluded.schedule",
            params![person_id.as_bytes().as_slice(), bytes],
        )?;
        Ok(())
    }

    fn insert_absence(&mut self, entry: &AbsenceEntry) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT INTO absences (absence_id, person_id, absence_date, hours, kind) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.id.as_bytes().as_slice(),
                    entry.person_id.as_bytes().as_slice(),
                    entry.date,
                    entry.hours,
                    entry.kind.as_str(),
                ],
            )
            .map_err(|e| map_constraint(e, format!("absence {}", entry.id)))?;
        Ok(())
    }

    fn find_absences(
        &self,
        person_ids: &[PersonId],
        range: DateRange,
    ) -> Result<Vec<AbsenceEntry>, StorageError> {
        if person_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT absence_id, person_id, absence_date, hours, kind FROM absences WHERE {}
             ORDER BY absence_date, absence_id",
            person_range_filter(person_ids, "absence_date", "absence_date")
        );
        let values = person_range_values(person_ids, range);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, NaiveDate>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (id_bytes, person_bytes, date, hours, kind) = row?;
            result.push(AbsenceEntry {
                id: AbsenceId::from_bytes(to_id16(id_bytes, "absence_id")?),
                person_id: PersonId::from_bytes(to_id16(person_bytes, "person_id")?),
                date,
                hours,
                kind: AbsenceKind::parse(&kind)?,
            });
        }
        Ok(result)
    }

    fn upsert_external_event(&mut self, event: &ExternalEvent) -> Result<(), StorageError> {
        let range = event.date_range()?;
        let timing = rmp_serde::to_vec(&event.timing)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO external_events (external_id, person_id, title, start_date, end_date, timing)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(person_id, external_id) DO UPDATE SET
                title = excluded.title, start_date = excluded.start_date,
                end_date = excluded.end_date, timing = excluded.timing",
            params![
                event.external_id,
                event.person_id.as_bytes().as_slice(),
                event.title,
                range.start(),
                range.end(),
                timing,
            ],
        )?;
        Ok(())
    }

    fn find_external_events(
        &self,
        person_ids: &[PersonId],
        range: DateRange,
    ) -> Result<Vec<ExternalEvent>, StorageError> {
        if person_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT external_id, person_id, title, timing FROM external_events WHERE {}
             ORDER BY start_date, external_id",
            person_range_filter(person_ids, "start_date", "end_date")
        );
        let values = person_range_values(person_ids, range);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (external_id, person_bytes, title, timing_bytes) = row?;
            let timing: EventTiming = rmp_serde::from_slice(&timing_bytes)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            result.push(ExternalEvent {
                external_id,
                person_id: PersonId::from_bytes(to_id16(person_bytes, "person_id")?),
                title,
                timing,
            });
        }
        Ok(result)
    }
}
