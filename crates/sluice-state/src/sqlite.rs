//! `SQLite`-backed implementation of [`StateBackend`].
//!
//! Uses a single `Mutex<Connection>` so the backend is `Send + Sync`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::Connection;
use sluice_types::journal::{FailureNote, Timestamp};
use sluice_types::state::{ProjectName, ProjectState, RunStats, RunStatus};

use crate::backend::StateBackend;
use crate::error::{self, StateError};

/// Idempotent DDL for state tables.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS project_state (
    project TEXT NOT NULL,
    submodule TEXT NOT NULL,
    blob_json TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (project, submodule)
);

CREATE TABLE IF NOT EXISTS project_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL DEFAULT (datetime('now')),
    finished_at TEXT,
    records_acquired INTEGER DEFAULT 0,
    records_exported INTEGER DEFAULT 0,
    files_parsed INTEGER DEFAULT 0,
    files_quarantined INTEGER DEFAULT 0,
    error_message TEXT
);

CREATE TABLE IF NOT EXISTS failure_journal (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project TEXT NOT NULL,
    message TEXT NOT NULL,
    context TEXT,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_failure_journal_project ON failure_journal (project, id);
";

/// `SQLite`-backed state storage.
///
/// Create with [`SqliteStateBackend::open`] for file-backed persistence
/// or [`SqliteStateBackend::in_memory`] for tests.
pub struct SqliteStateBackend {
    conn: Mutex<Connection>,
}

impl SqliteStateBackend {
    /// Open or create a `SQLite` state database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the directory can't be created,
    /// or [`StateError::Sqlite`] if the database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(StateError::backend)?;
        conn.execute_batch(CREATE_TABLES)
            .map_err(StateError::backend)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory `SQLite` backend (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Sqlite`] if the in-memory database can't
    /// be initialized.
    pub fn in_memory() -> error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StateError::backend)?;
        conn.execute_batch(CREATE_TABLES)
            .map_err(StateError::backend)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection lock.
    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StateError::LockPoisoned)
    }

    /// Current UTC time as ISO-8601.
    fn now_iso8601() -> String {
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    #[cfg(test)]
    fn get_run_row(&self, run_id: i64) -> error::Result<(String, i64, Option<String>, Option<String>)> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT status, records_acquired, finished_at, error_message FROM project_runs WHERE id = ?1",
            [run_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .map_err(StateError::backend)
    }
}

impl StateBackend for SqliteStateBackend {
    fn load_state(&self, project: &ProjectName) -> error::Result<ProjectState> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT submodule, blob_json FROM project_state \
                 WHERE project = ?1 ORDER BY submodule",
            )
            .map_err(StateError::backend)?;

        let rows = stmt
            .query_map([project.as_str()], |row| {
                let submodule: String = row.get(0)?;
                let blob_json: String = row.get(1)?;
                Ok((submodule, blob_json))
            })
            .map_err(StateError::backend)?;

        let mut entries = Vec::new();
        for row in rows {
            let (submodule, blob_json) = row.map_err(StateError::backend)?;
            let value: serde_json::Value = serde_json::from_str(&blob_json)
                .map_err(|source| StateError::Corrupt {
                    submodule: submodule.clone(),
                    source,
                })?;
            entries.push((submodule, value));
        }
        Ok(entries.into_iter().collect())
    }

    fn save_state(&self, project: &ProjectName, state: &ProjectState) -> error::Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StateError::backend_context("save_state: begin tx", e))?;
        tx.execute(
            "DELETE FROM project_state WHERE project = ?1",
            [project.as_str()],
        )
        .map_err(|e| StateError::backend_context("save_state: clear", e))?;

        let mut stmt = tx
            .prepare(
                "INSERT INTO project_state (project, submodule, blob_json, updated_at) \
                 VALUES (?1, ?2, ?3, datetime('now'))",
            )
            .map_err(|e| StateError::backend_context("save_state: prepare", e))?;
        for (submodule, value) in state.iter() {
            stmt.execute(rusqlite::params![
                project.as_str(),
                submodule,
                value.to_string(),
            ])
            .map_err(|e| StateError::backend_context("save_state: execute", e))?;
        }
        drop(stmt);
        tx.commit()
            .map_err(|e| StateError::backend_context("save_state: commit", e))?;
        Ok(())
    }

    fn record_failure(&self, note: &FailureNote) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO failure_journal (project, message, context, recorded_at) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                note.project.as_str(),
                note.message,
                note.context,
                note.recorded_at.as_str(),
            ],
        )
        .map_err(|e| StateError::backend_context("record_failure", e))?;
        Ok(())
    }

    fn failures(&self, project: &ProjectName, limit: usize) -> error::Result<Vec<FailureNote>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT message, context, recorded_at FROM failure_journal \
                 WHERE project = ?1 ORDER BY id DESC LIMIT ?2",
            )
            .map_err(StateError::backend)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(rusqlite::params![project.as_str(), limit], |row| {
                let message: String = row.get(0)?;
                let context: Option<String> = row.get(1)?;
                let recorded_at: String = row.get(2)?;
                Ok((message, context, recorded_at))
            })
            .map_err(StateError::backend)?;

        let mut notes = Vec::new();
        for row in rows {
            let (message, context, recorded_at) = row.map_err(StateError::backend)?;
            notes.push(FailureNote {
                project: project.clone(),
                message,
                context,
                recorded_at: Timestamp::new(recorded_at),
            });
        }
        Ok(notes)
    }

    fn start_run(&self, project: &ProjectName) -> error::Result<i64> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO project_runs (project, status) VALUES (?1, ?2)",
            rusqlite::params![project.as_str(), RunStatus::Running.as_str()],
        )
        .map_err(StateError::backend)?;
        Ok(conn.last_insert_rowid())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE project_runs SET status = ?1, finished_at = datetime('now'), \
             records_acquired = ?2, records_exported = ?3, files_parsed = ?4, \
             files_quarantined = ?5, error_message = ?6 \
             WHERE id = ?7",
            rusqlite::params![
                status.as_str(),
                stats.records_acquired as i64,
                stats.records_exported as i64,
                stats.files_parsed as i64,
                stats.files_quarantined as i64,
                stats.error_message,
                run_id,
            ],
        )
        .map_err(StateError::backend)?;
        Ok(())
    }
}

/// Build a journal note stamped with the current time.
#[must_use]
pub fn failure_note(project: &ProjectName, message: String, context: Option<String>) -> FailureNote {
    FailureNote {
        project: project.clone(),
        message,
        context,
        recorded_at: Timestamp::new(SqliteStateBackend::now_iso8601()),
    }
}
