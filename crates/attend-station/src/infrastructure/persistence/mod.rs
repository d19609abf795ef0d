//! SQLite-backed persistence models.
//!
//! One [`Database`] handle wraps a single `rusqlite::Connection` behind a
//! mutex.  Model calls run the blocking SQLite work on Tokio's blocking pool
//! via [`Database::run`], so the event loop never waits on disk I/O.
//!
//! # Schema
//!
//! ```text
//! members(id TEXT PK, name TEXT, uid TEXT UNIQUE NULL, note TEXT, created_at TEXT)
//! records(id TEXT PK, member_id TEXT NULL → members.id, uid TEXT, reader TEXT,
//!         recorded_at TEXT)
//! ```
//!
//! Timestamps are stored as RFC 3339 UTC strings with microsecond precision,
//! which sort lexicographically in time order.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::dispatch::ModelError;

pub mod member_store;
pub mod record_store;

pub use member_store::SqliteMemberStore;
pub use record_store::SqliteRecordStore;

/// Error type for opening the database.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("failed to set up schema: {0}")]
    Schema(#[from] rusqlite::Error),
}

/// Shared handle to the station database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (creating if needed) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the directory cannot be created, the
    /// file cannot be opened, or the schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PersistenceError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path).map_err(|source| PersistenceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        setup_schema(&conn)?;
        info!("database opened at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// Opens a private in-memory database (tests, `--database :memory:`).
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Schema`] if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        setup_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` against the connection on the blocking thread pool.
    pub(crate) async fn run<T, F>(&self, f: F) -> Result<T, ModelError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ModelError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| ModelError::Storage("database lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| ModelError::Storage(format!("database task failed: {e}")))?
    }
}

/// Applies pragmas and creates tables and indexes if missing.
pub fn setup_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    // In-memory databases answer "memory"; either way the pragma succeeds.
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS members (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            uid         TEXT UNIQUE,
            note        TEXT,
            created_at  TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS records (
            id          TEXT PRIMARY KEY,
            member_id   TEXT REFERENCES members(id) ON DELETE SET NULL,
            uid         TEXT NOT NULL,
            reader      TEXT,
            recorded_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_records_recorded_at ON records(recorded_at);
        CREATE INDEX IF NOT EXISTS idx_records_member_id ON records(member_id);
        CREATE INDEX IF NOT EXISTS idx_records_uid ON records(uid);",
    )
}

// ── Row helpers ───────────────────────────────────────────────────────────────

/// Current time at the precision the database keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Formats an inclusive lower bound, rounding sub-microsecond time up so the
/// stored precision never admits rows earlier than `t`.
pub(crate) fn format_lower_bound(t: &DateTime<Utc>) -> String {
    let truncated = t.trunc_subsecs(6);
    if truncated < *t {
        format_time(&(truncated + Duration::microseconds(1)))
    } else {
        format_time(&truncated)
    }
}

/// Formats an inclusive upper bound; truncation already rounds down.
pub(crate) fn format_upper_bound(t: &DateTime<Utc>) -> String {
    format_time(t)
}

pub(crate) fn column_time(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn column_uuid(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn column_opt_uuid(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<Uuid>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        Uuid::parse_str(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Maps SQLite errors onto model errors; constraint violations are conflicts.
pub(crate) fn model_error(e: rusqlite::Error) -> ModelError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation => {
            ModelError::Conflict(e.to_string())
        }
        _ => ModelError::Storage(e.to_string()),
    }
}
