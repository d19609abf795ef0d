//! `records` table: one row per card tap the frontend chose to record.

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use attend_core::{NewRecord, Record, RecordQuery};

use super::{
    column_opt_uuid, column_time, column_uuid, format_lower_bound, format_time, format_upper_bound,
    model_error, now, Database,
};
use crate::application::dispatch::{ModelError, RecordModel};

const SELECT_RECORD: &str = "SELECT id, member_id, uid, reader, recorded_at FROM records";

/// [`RecordModel`] backed by SQLite.
#[derive(Clone)]
pub struct SqliteRecordStore {
    db: Database,
}

impl SqliteRecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: column_uuid(row, 0)?,
        member_id: column_opt_uuid(row, 1)?,
        uid: row.get(2)?,
        reader: row.get(3)?,
        recorded_at: column_time(row, 4)?,
    })
}

#[async_trait]
impl RecordModel for SqliteRecordStore {
    /// Stores a tap; the member is resolved from the UID at insert time.
    async fn create(&self, new: NewRecord) -> Result<Record, ModelError> {
        self.db
            .run(move |conn| {
                let member_id: Option<String> = conn
                    .query_row("SELECT id FROM members WHERE uid = ?1", [&new.uid], |row| {
                        row.get(0)
                    })
                    .optional()
                    .map_err(model_error)?;
                let member_id = member_id
                    .map(|id| Uuid::parse_str(&id))
                    .transpose()
                    .map_err(|e| ModelError::Storage(e.to_string()))?;

                let record = Record {
                    id: Uuid::new_v4(),
                    member_id,
                    uid: new.uid,
                    reader: new.reader,
                    recorded_at: now(),
                };
                conn.execute(
                    "INSERT INTO records (id, member_id, uid, reader, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        record.id.to_string(),
                        record.member_id.map(|id| id.to_string()),
                        record.uid,
                        record.reader,
                        format_time(&record.recorded_at),
                    ],
                )
                .map_err(model_error)?;
                debug!("record {} stored for uid {}", record.id, record.uid);
                Ok(record)
            })
            .await
    }

    /// Newest first. Taps stored in the same microsecond fall back to insertion order.
    async fn find_all(&self, query: RecordQuery) -> Result<Vec<Record>, ModelError> {
        let since = query.since.as_ref().map(format_lower_bound);
        let until = query.until.as_ref().map(format_upper_bound);
        self.db
            .run(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "{SELECT_RECORD}
                         WHERE (?1 IS NULL OR recorded_at >= ?1)
                           AND (?2 IS NULL OR recorded_at <= ?2)
                         ORDER BY recorded_at DESC, rowid DESC"
                    ))
                    .map_err(model_error)?;
                let rows = stmt
                    .query_map(params![since, until], record_from_row)
                    .map_err(model_error)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(model_error)
            })
            .await
    }

    async fn find_by_member(&self, member_id: Uuid) -> Result<Vec<Record>, ModelError> {
        self.db
            .run(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "{SELECT_RECORD}
                         WHERE member_id = ?1
                         ORDER BY recorded_at DESC, rowid DESC"
                    ))
                    .map_err(model_error)?;
                let rows = stmt
                    .query_map([member_id.to_string()], record_from_row)
                    .map_err(model_error)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(model_error)
            })
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ModelError> {
        self.db
            .run(move |conn| {
                let affected = conn
                    .execute("DELETE FROM records WHERE id = ?1", [id.to_string()])
                    .map_err(model_error)?;
                Ok(affected > 0)
            })
            .await
    }
}
