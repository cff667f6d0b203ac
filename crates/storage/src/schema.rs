use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

// Dates are ISO-8601 TEXT so range predicates compare lexicographically.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS allocations (
    allocation_id BLOB PRIMARY KEY CHECK (length(allocation_id) = 16),
    person_id BLOB NOT NULL CHECK (length(person_id) = 16),
    project_id BLOB NOT NULL CHECK (length(project_id) = 16),
    phase_id BLOB CHECK (phase_id IS NULL OR length(phase_id) = 16),
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    hours REAL NOT NULL CHECK (hours > 0),
    billable INTEGER NOT NULL DEFAULT 1,
    notes TEXT,
    created_by BLOB CHECK (created_by IS NULL OR length(created_by) = 16),
    CHECK (start_date <= end_date)
);
CREATE INDEX IF NOT EXISTS idx_allocations_pair ON allocations (person_id, project_id, start_date);
CREATE INDEX IF NOT EXISTS idx_allocations_person_range ON allocations (person_id, start_date, end_date);
CREATE INDEX IF NOT EXISTS idx_allocations_range ON allocations (start_date, end_date);

CREATE TABLE IF NOT EXISTS work_schedules (
    person_id BLOB PRIMARY KEY CHECK (length(person_id) = 16),
    schedule BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS absences (
    absence_id BLOB PRIMARY KEY CHECK (length(absence_id) = 16),
    person_id BLOB NOT NULL CHECK (length(person_id) = 16),
    absence_date TEXT NOT NULL,
    hours REAL NOT NULL CHECK (hours > 0),
    kind TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_absences_person_date ON absences (person_id, absence_date);

CREATE TABLE IF NOT EXISTS external_events (
    external_id TEXT NOT NULL,
    person_id BLOB NOT NULL CHECK (length(person_id) = 16),
    title TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    timing BLOB NOT NULL,
    PRIMARY KEY (person_id, external_id)
);
CREATE INDEX IF NOT EXISTS idx_external_events_range ON external_events (person_id, start_date, end_date);
";
