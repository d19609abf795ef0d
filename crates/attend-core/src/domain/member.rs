//! Member entity: a person who owns an NFC card.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered member.
///
/// `uid` holds the card UID in display form (`"04 A3 9F"`), exactly as the
/// frontend received it on the `uid` channel, and is unique across members.
/// A member may be registered before a card is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload of `member.create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewMember {
    /// Builds the stored member, assigning a fresh id and creation time.
    pub fn into_member(self, now: DateTime<Utc>) -> Member {
        Member {
            id: Uuid::new_v4(),
            name: self.name,
            uid: self.uid,
            note: self.note,
            created_at: now,
        }
    }
}

/// Payload of `member.update`.  Absent fields keep their stored value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemberPatch {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl MemberPatch {
    /// Applies the patch in place.
    pub fn apply(self, member: &mut Member) {
        if let Some(name) = self.name {
            member.name = name;
        }
        if let Some(uid) = self.uid {
            member.uid = Some(uid);
        }
        if let Some(note) = self.note {
            member.note = Some(note);
        }
    }
}
