//! Integration tests for the dispatch gateway over an on-disk SQLite file.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use attend_core::DispatchError;
use attend_station::application::dispatch::DispatchGateway;
use attend_station::application::report_errors::ErrorReporter;
use attend_station::infrastructure::persistence::{
    Database, SqliteMemberStore, SqliteRecordStore,
};

#[derive(Default)]
struct CollectingReporter {
    messages: Mutex<Vec<String>>,
}

impl ErrorReporter for CollectingReporter {
    fn show_error_box(&self, _title: &str, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

fn gateway_for(db: Database, reporter: Arc<CollectingReporter>) -> DispatchGateway {
    DispatchGateway::new(
        Arc::new(SqliteMemberStore::new(db.clone())),
        Arc::new(SqliteRecordStore::new(db)),
        reporter,
        "錯誤",
    )
}

#[tokio::test]
async fn test_data_survives_reopening_the_database_file() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attendance.db");
    let reporter = Arc::new(CollectingReporter::default());

    // Act
    {
        let gateway = gateway_for(Database::open(&path).unwrap(), reporter.clone());
        gateway
            .handle("member", "create", json!({"name": "Alice", "uid": "04 A3 9F"}))
            .await
            .expect("create succeeds");
        gateway
            .handle("record", "create", json!({"uid": "04 A3 9F"}))
            .await
            .expect("record succeeds");
    }
    let reopened = gateway_for(Database::open(&path).unwrap(), reporter.clone());
    let found = reopened
        .handle("member", "findByUid", json!({"uid": "04 A3 9F"}))
        .await
        .unwrap();
    let records = reopened.handle("record", "findAll", Value::Null).await.unwrap();

    // Assert
    assert_eq!(found["name"], "Alice");
    assert_eq!(records.as_array().map(Vec::len), Some(1));
    assert_eq!(records[0]["member_id"], found["id"]);
    assert!(reporter.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_uid_goes_to_error_dialog() {
    let reporter = Arc::new(CollectingReporter::default());
    let gateway = gateway_for(Database::open_in_memory().unwrap(), reporter.clone());
    gateway
        .handle("member", "create", json!({"name": "Alice", "uid": "04"}))
        .await
        .unwrap();

    let second = gateway
        .handle("member", "create", json!({"name": "Bob", "uid": "04"}))
        .await;

    assert!(second.is_none());
    let messages = reporter.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("conflict"));
}

#[test]
fn test_try_handle_reports_unknown_action_without_dialog() {
    let reporter = Arc::new(CollectingReporter::default());
    let gateway = gateway_for(Database::open_in_memory().unwrap(), reporter.clone());

    let result = tokio_test::block_on(gateway.try_handle("record", "purge", Value::Null));

    assert!(matches!(result, Err(DispatchError::UnknownAction { .. })));
    assert!(reporter.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_record_time_window_query() {
    let reporter = Arc::new(CollectingReporter::default());
    let gateway = gateway_for(Database::open_in_memory().unwrap(), reporter);
    gateway
        .handle("record", "create", json!({"uid": "01"}))
        .await
        .unwrap();

    let future = gateway
        .handle("record", "findAll", json!({"since": "2999-01-01T00:00:00Z"}))
        .await
        .unwrap();
    let past = gateway
        .handle("record", "findAll", json!({"until": "2999-01-01T00:00:00Z"}))
        .await
        .unwrap();

    assert_eq!(future, json!([]));
    assert_eq!(past.as_array().map(Vec::len), Some(1));
}

fn field(rows: &Value, key: &str) -> Vec<Value> {
    rows.as_array()
        .map(|rows| rows.iter().map(|row| row[key].clone()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_find_all_actions_return_documented_order() {
    // Arrange
    let reporter = Arc::new(CollectingReporter::default());
    let gateway = gateway_for(Database::open_in_memory().unwrap(), reporter.clone());
    let zoe = gateway
        .handle("member", "create", json!({"name": "Zoe", "uid": "0Z"}))
        .await
        .unwrap();
    gateway
        .handle("member", "create", json!({"name": "Alice", "uid": "0A"}))
        .await
        .unwrap();
    for (uid, reader) in [("0Z", "first"), ("01", "other"), ("0Z", "second")] {
        gateway
            .handle("record", "create", json!({"uid": uid, "reader": reader}))
            .await
            .unwrap();
    }

    // Act
    let members = gateway.handle("member", "findAll", Value::Null).await.unwrap();
    let records = gateway.handle("record", "findAll", json!({})).await.unwrap();
    let zoes = gateway
        .handle("record", "findByMember", json!({"member_id": zoe["id"]}))
        .await
        .unwrap();

    // Assert
    assert_eq!(field(&members, "name"), [json!("Alice"), json!("Zoe")]);
    assert_eq!(
        field(&records, "reader"),
        [json!("second"), json!("other"), json!("first")]
    );
    assert_eq!(field(&zoes, "reader"), [json!("second"), json!("first")]);
    assert!(reporter.messages.lock().unwrap().is_empty());
}
