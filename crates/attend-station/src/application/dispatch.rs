//! DispatchGatewayUseCase: routes frontend persistence requests to models.
//!
//! The frontend sends `{ model, action, data }` on the `db` channel.  The
//! gateway:
//!
//! 1. Resolves `(model, action)` against the closed routing table in
//!    [`attend_core::domain::dispatch`].  Unknown pairs fail with
//!    [`DispatchError::UnknownModel`] / [`DispatchError::UnknownAction`].
//! 2. Deserializes `data` into the action's payload type.
//! 3. Awaits the model action and serializes its result unchanged.
//!
//! # Failure path
//!
//! [`DispatchGateway::handle`] never hands an error back to the frontend.
//! Every failure is shown in the operator error dialog and the request is
//! answered with no value.  [`DispatchGateway::try_handle`] is the same
//! pipeline without the dialog, for callers that need the typed outcome.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use attend_core::{
    DispatchError, DispatchTarget, Member, MemberAction, MemberPatch, NewMember, NewRecord,
    Record, RecordAction, RecordQuery,
};

use super::report_errors::ErrorReporter;

// ── Model contracts ───────────────────────────────────────────────────────────

/// Error raised by a persistence model action.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<ModelError> for DispatchError {
    fn from(e: ModelError) -> Self {
        DispatchError::PersistenceActionFailure(e.to_string())
    }
}

/// The member model: one method per [`MemberAction`].
#[async_trait]
pub trait MemberModel: Send + Sync {
    async fn create(&self, new: NewMember) -> Result<Member, ModelError>;
    async fn find_all(&self) -> Result<Vec<Member>, ModelError>;
    async fn find_by_uid(&self, uid: &str) -> Result<Option<Member>, ModelError>;
    async fn update(&self, patch: MemberPatch) -> Result<Member, ModelError>;
    async fn delete(&self, id: Uuid) -> Result<bool, ModelError>;
}

/// The attendance record model: one method per [`RecordAction`].
#[async_trait]
pub trait RecordModel: Send + Sync {
    async fn create(&self, new: NewRecord) -> Result<Record, ModelError>;
    async fn find_all(&self, query: RecordQuery) -> Result<Vec<Record>, ModelError>;
    async fn find_by_member(&self, member_id: Uuid) -> Result<Vec<Record>, ModelError>;
    async fn delete(&self, id: Uuid) -> Result<bool, ModelError>;
}

// ── Payload shapes ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IdPayload {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct UidPayload {
    uid: String,
}

#[derive(Debug, Deserialize)]
struct MemberIdPayload {
    member_id: Uuid,
}

// ── Gateway ───────────────────────────────────────────────────────────────────

/// Routes `(model, action, data)` requests to the member and record models.
pub struct DispatchGateway {
    members: Arc<dyn MemberModel>,
    records: Arc<dyn RecordModel>,
    reporter: Arc<dyn ErrorReporter>,
    dialog_title: String,
}

impl DispatchGateway {
    pub fn new(
        members: Arc<dyn MemberModel>,
        records: Arc<dyn RecordModel>,
        reporter: Arc<dyn ErrorReporter>,
        dialog_title: impl Into<String>,
    ) -> Self {
        Self {
            members,
            records,
            reporter,
            dialog_title: dialog_title.into(),
        }
    }

    /// Runs a request; failures go to the error dialog and yield `None`.
    pub async fn handle(&self, model: &str, action: &str, data: Value) -> Option<Value> {
        match self.try_handle(model, action, data).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("dispatch {model}.{action} failed: {e}");
                self.reporter.show_error_box(&self.dialog_title, &e.to_string());
                None
            }
        }
    }

    /// Runs a request and returns the typed outcome.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::UnknownModel`] / [`DispatchError::UnknownAction`]
    ///   when the pair is not in the routing table.
    /// - [`DispatchError::PersistenceActionFailure`] when the payload does not
    ///   fit the action or the model action fails.
    pub async fn try_handle(
        &self,
        model: &str,
        action: &str,
        data: Value,
    ) -> Result<Value, DispatchError> {
        let target = DispatchTarget::resolve(model, action)?;
        debug!("dispatching {model}.{action}");
        match target {
            DispatchTarget::Member(action) => self.run_member(action, data).await,
            DispatchTarget::Record(action) => self.run_record(action, data).await,
        }
    }

    async fn run_member(&self, action: MemberAction, data: Value) -> Result<Value, DispatchError> {
        let target = DispatchTarget::Member(action);
        match action {
            MemberAction::Create => {
                let new: NewMember = payload(target, data)?;
                to_value(self.members.create(new).await?)
            }
            MemberAction::FindAll => to_value(self.members.find_all().await?),
            MemberAction::FindByUid => {
                let p: UidPayload = payload(target, data)?;
                to_value(self.members.find_by_uid(&p.uid).await?)
            }
            MemberAction::Update => {
                let patch: MemberPatch = payload(target, data)?;
                to_value(self.members.update(patch).await?)
            }
            MemberAction::Delete => {
                let p: IdPayload = payload(target, data)?;
                to_value(self.members.delete(p.id).await?)
            }
        }
    }

    async fn run_record(&self, action: RecordAction, data: Value) -> Result<Value, DispatchError> {
        let target = DispatchTarget::Record(action);
        match action {
            RecordAction::Create => {
                let new: NewRecord = payload(target, data)?;
                to_value(self.records.create(new).await?)
            }
            RecordAction::FindAll => {
                // `null` means "no bounds".
                let query: RecordQuery = if data.is_null() {
                    RecordQuery::default()
                } else {
                    payload(target, data)?
                };
                to_value(self.records.find_all(query).await?)
            }
            RecordAction::FindByMember => {
                let p: MemberIdPayload = payload(target, data)?;
                to_value(self.records.find_by_member(p.member_id).await?)
            }
            RecordAction::Delete => {
                let p: IdPayload = payload(target, data)?;
                to_value(self.records.delete(p.id).await?)
            }
        }
    }
}

fn payload<T: DeserializeOwned>(target: DispatchTarget, data: Value) -> Result<T, DispatchError> {
    serde_json::from_value(data).map_err(|e| {
        DispatchError::PersistenceActionFailure(format!(
            "invalid payload for {}.{}: {e}",
            target.model(),
            target.action_name()
        ))
    })
}

fn to_value<T: Serialize>(value: T) -> Result<Value, DispatchError> {
    serde_json::to_value(value)
        .map_err(|e| DispatchError::PersistenceActionFailure(format!("unserializable result: {e}")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
