//! Record entity: one attendance event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An attendance event.
///
/// `member_id` is resolved from `uid` when the record is written; it is
/// `None` when the card was not registered at that time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub member_id: Option<Uuid>,
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Payload of `record.create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub uid: String,
    #[serde(default)]
    pub reader: Option<String>,
}

/// Payload of `record.findAll`.  Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordQuery {
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parses_rfc3339_strings() {
        let json = r#"{"since":"2024-03-01T08:00:00Z"}"#;
        let q: RecordQuery = serde_json::from_str(json).unwrap();
        assert!(q.since.is_some());
        assert!(q.until.is_none());
    }
}
