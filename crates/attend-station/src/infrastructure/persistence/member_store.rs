//! `members` table.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use attend_core::{Member, MemberPatch, NewMember};

use super::{column_time, column_uuid, format_time, model_error, now, Database};
use crate::application::dispatch::{MemberModel, ModelError};

const SELECT_MEMBER: &str = "SELECT id, name, uid, note, created_at FROM members";

/// [`MemberModel`] backed by SQLite.
#[derive(Clone)]
pub struct SqliteMemberStore {
    db: Database,
}

impl SqliteMemberStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn member_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: column_uuid(row, 0)?,
        name: row.get(1)?,
        uid: row.get(2)?,
        note: row.get(3)?,
        created_at: column_time(row, 4)?,
    })
}

fn select_by_id(conn: &Connection, id: Uuid) -> Result<Option<Member>, ModelError> {
    conn.query_row(
        &format!("{SELECT_MEMBER} WHERE id = ?1"),
        [id.to_string()],
        member_from_row,
    )
    .optional()
    .map_err(model_error)
}

#[async_trait]
impl MemberModel for SqliteMemberStore {
    async fn create(&self, new: NewMember) -> Result<Member, ModelError> {
        let member = new.into_member(now());
        self.db
            .run(move |conn| {
                conn.execute(
                    "INSERT INTO members (id, name, uid, note, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        member.id.to_string(),
                        member.name,
                        member.uid,
                        member.note,
                        format_time(&member.created_at),
                    ],
                )
                .map_err(model_error)?;
                debug!("member {} created", member.id);
                Ok(member)
            })
            .await
    }

    async fn find_all(&self) -> Result<Vec<Member>, ModelError> {
        self.db
            .run(|conn| {
                let mut stmt = conn
                    .prepare(&format!("{SELECT_MEMBER} ORDER BY name, created_at"))
                    .map_err(model_error)?;
                let rows = stmt.query_map([], member_from_row).map_err(model_error)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(model_error)
            })
            .await
    }

    async fn find_by_uid(&self, uid: &str) -> Result<Option<Member>, ModelError> {
        let uid = uid.to_string();
        self.db
            .run(move |conn| {
                conn.query_row(
                    &format!("{SELECT_MEMBER} WHERE uid = ?1"),
                    [uid],
                    member_from_row,
                )
                .optional()
                .map_err(model_error)
            })
            .await
    }

    async fn update(&self, patch: MemberPatch) -> Result<Member, ModelError> {
        self.db
            .run(move |conn| {
                let tx = conn.transaction().map_err(model_error)?;
                let mut member = select_by_id(&tx, patch.id)?
                    .ok_or_else(|| ModelError::NotFound(format!("member {}", patch.id)))?;
                patch.apply(&mut member);
                tx.execute(
                    "UPDATE members SET name = ?2, uid = ?3, note = ?4 WHERE id = ?1",
                    params![
                        member.id.to_string(),
                        member.name,
                        member.uid,
                        member.note
                    ],
                )
                .map_err(model_error)?;
                tx.commit().map_err(model_error)?;
                Ok(member)
            })
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ModelError> {
        self.db
            .run(move |conn| {
                let affected = conn
                    .execute("DELETE FROM members WHERE id = ?1", [id.to_string()])
                    .map_err(model_error)?;
                Ok(affected > 0)
            })
            .await
    }
}
