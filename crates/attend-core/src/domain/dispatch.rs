//! Routing table for persistence requests coming from the frontend.
//!
//! The frontend names a model and an action as plain strings
//! (`"member"`, `"findByUid"`).  Instead of looking methods up by name at
//! runtime, every supported pair is listed in [`ROUTES`] and resolves to a
//! [`DispatchTarget`].  Anything else is a typed [`DispatchError`].
//!
//! ```text
//! ("member", "create")   → DispatchTarget::Member(MemberAction::Create)
//! ("record", "findAll")  → DispatchTarget::Record(RecordAction::FindAll)
//! ("invoice", "create")  → Err(DispatchError::UnknownModel("invoice"))
//! ("member", "explode")  → Err(DispatchError::UnknownAction { .. })
//! ```

use std::fmt;

use thiserror::Error;

/// The persistence models reachable through the dispatch gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelName {
    Member,
    Record,
}

impl ModelName {
    /// Wire name used by the frontend.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelName::Member => "member",
            ModelName::Record => "record",
        }
    }

    /// Parses a wire model name.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownModel`] for anything but `member` and
    /// `record`.
    pub fn parse(name: &str) -> Result<Self, DispatchError> {
        match name {
            "member" => Ok(ModelName::Member),
            "record" => Ok(ModelName::Record),
            other => Err(DispatchError::UnknownModel(other.to_string())),
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions exposed by the member model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberAction {
    /// `{ name, uid, note? }` → created member.
    Create,
    /// No payload → every member, ordered by name.
    FindAll,
    /// `{ uid }` → the member holding that card, or `null`.
    FindByUid,
    /// `{ id, name?, uid?, note? }` → updated member.
    Update,
    /// `{ id }` → `true` if a member was removed.
    Delete,
}

/// Actions exposed by the record (attendance log) model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordAction {
    /// `{ uid, reader? }` → created record.
    Create,
    /// `{ since?, until? }` → records, newest first.
    FindAll,
    /// `{ member_id }` → that member's records, newest first.
    FindByMember,
    /// `{ id }` → `true` if a record was removed.
    Delete,
}

/// A fully resolved `(model, action)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchTarget {
    Member(MemberAction),
    Record(RecordAction),
}

/// Every `(model, action)` pair the gateway will route.
pub const ROUTES: &[(ModelName, &str, DispatchTarget)] = &[
    (ModelName::Member, "create", DispatchTarget::Member(MemberAction::Create)),
    (ModelName::Member, "findAll", DispatchTarget::Member(MemberAction::FindAll)),
    (ModelName::Member, "findByUid", DispatchTarget::Member(MemberAction::FindByUid)),
    (ModelName::Member, "update", DispatchTarget::Member(MemberAction::Update)),
    (ModelName::Member, "delete", DispatchTarget::Member(MemberAction::Delete)),
    (ModelName::Record, "create", DispatchTarget::Record(RecordAction::Create)),
    (ModelName::Record, "findAll", DispatchTarget::Record(RecordAction::FindAll)),
    (ModelName::Record, "findByMember", DispatchTarget::Record(RecordAction::FindByMember)),
    (ModelName::Record, "delete", DispatchTarget::Record(RecordAction::Delete)),
];

impl DispatchTarget {
    /// Resolves wire names to a target using [`ROUTES`].
    ///
    /// # Errors
    ///
    /// - [`DispatchError::UnknownModel`] if `model` is not a known model.
    /// - [`DispatchError::UnknownAction`] if the model has no such action.
    pub fn resolve(model: &str, action: &str) -> Result<Self, DispatchError> {
        let model = ModelName::parse(model)?;
        ROUTES
            .iter()
            .find(|(m, a, _)| *m == model && *a == action)
            .map(|(_, _, target)| *target)
            .ok_or_else(|| DispatchError::UnknownAction {
                model,
                action: action.to_string(),
            })
    }

    /// The model this target belongs to.
    pub fn model(self) -> ModelName {
        match self {
            DispatchTarget::Member(_) => ModelName::Member,
            DispatchTarget::Record(_) => ModelName::Record,
        }
    }

    /// The wire action name of this target.
    pub fn action_name(self) -> &'static str {
        ROUTES
            .iter()
            .find(|(_, _, t)| *t == self)
            .map(|(_, a, _)| *a)
            .unwrap_or("unknown")
    }
}

/// Failure of a dispatch request.
///
/// None of these reach the frontend as data; the gateway turns them into an
/// error dialog and replies with no value.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request named a model outside `{member, record}`.
    #[error("Call DB Error: unknown model `{0}`")]
    UnknownModel(String),

    /// The model exists but has no action by that name.
    #[error("Call DB Error: model `{model}` has no action `{action}`")]
    UnknownAction { model: ModelName, action: String },

    /// The model action itself failed (bad payload, constraint, I/O).
    #[error("{0}")]
    PersistenceActionFailure(String),
}
