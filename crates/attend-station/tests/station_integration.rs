//! Integration tests for the whole station: event loop, WebSocket bridge,
//! single-instance lock and SQLite persistence wired together the way
//! `main.rs` does it, with the mock card reader in place of PC/SC.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use attend_core::{StationMsg, WindowCommand};
use attend_station::application::dispatch::DispatchGateway;
use attend_station::application::lifecycle::{
    ContentSource, LifecycleManager, Platform, WindowSpec,
};
use attend_station::infrastructure::card_reader::mock::MockCardReader;
use attend_station::infrastructure::card_reader::CardReaderDriver;
use attend_station::infrastructure::driver_reset::UnsupportedPlatformReset;
use attend_station::infrastructure::instance_lock::{self, InstanceRole};
use attend_station::infrastructure::persistence::{
    Database, SqliteMemberStore, SqliteRecordStore,
};
use attend_station::infrastructure::ui_bridge::ws_server::{run_server, UiHub, WsWindowHost};
use attend_station::infrastructure::ui_bridge::{AppContext, AppParts, StationEvent};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── Harness ───────────────────────────────────────────────────────────────────

struct Station {
    port: u16,
    reader: MockCardReader,
    events: mpsc::UnboundedSender<StationEvent>,
    running: Arc<AtomicBool>,
    event_loop: JoinHandle<()>,
}

async fn start_station(platform: Platform) -> Station {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let hub = UiHub::new();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let db = Database::open_in_memory().unwrap();
    let reporter = Arc::new(hub.clone());
    let gateway = Arc::new(DispatchGateway::new(
        Arc::new(SqliteMemberStore::new(db.clone())),
        Arc::new(SqliteRecordStore::new(db)),
        reporter.clone(),
        "錯誤",
    ));
    let spec = WindowSpec {
        width: 800,
        height: 600,
        frameless: true,
        content: ContentSource::DevServer("http://localhost:8080".to_string()),
        dev_tools: false,
    };
    let reader = MockCardReader::new();
    let factory_reader = reader.clone();
    let parts = AppParts {
        lifecycle: LifecycleManager::new(
            platform,
            spec,
            Arc::new(WsWindowHost::new(hub.clone(), None)),
        ),
        gateway,
        reset: Arc::new(UnsupportedPlatformReset::new(Platform::Windows)),
        reporter,
        dialog_title: "錯誤".to_string(),
        driver_factory: Box::new(move || {
            Box::new(factory_reader.clone()) as Box<dyn CardReaderDriver>
        }),
    };

    let running = Arc::new(AtomicBool::new(true));
    tokio::spawn(run_server(
        listener,
        hub,
        events_tx.clone(),
        Arc::clone(&running),
    ));

    let mut ctx = AppContext::new(parts, events_tx.clone());
    ctx.on_ready();
    ctx.start_driver();
    let event_loop = tokio::spawn(ctx.run(events_rx));

    Station {
        port,
        reader,
        events: events_tx,
        running,
        event_loop,
    }
}

async fn connect(port: u16) -> Client {
    let (ws, _) = connect_async(format!("ws://127.0.0.1:{port}"))
        .await
        .expect("frontend must connect");
    ws
}

async fn send(ws: &mut Client, msg: Value) {
    ws.send(Message::Text(msg.to_string())).await.unwrap();
}

/// Reads station messages until one matches `pred`, failing after 5 s.
async fn recv_until(ws: &mut Client, pred: impl Fn(&StationMsg) -> bool) -> StationMsg {
    let wait = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let msg: StationMsg = serde_json::from_str(&text).unwrap();
                    if pred(&msg) {
                        return msg;
                    }
                }
                Some(Ok(_)) => {}
                other => panic!("connection ended: {other:?}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("expected message within timeout")
}

fn reply_value(msg: StationMsg) -> Value {
    match msg {
        StationMsg::Reply { value, .. } => value,
        other => panic!("expected reply, got {other:?}"),
    }
}

fn is_reply(id: u64) -> impl Fn(&StationMsg) -> bool {
    move |m| matches!(m, StationMsg::Reply { request_id, .. } if *request_id == id)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_card_tap_reaches_frontend_and_readers_are_listed() {
    // Arrange
    let station = start_station(Platform::Linux).await;
    let mut ws = connect(station.port).await;
    // Give the loop a moment to register the session.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Act
    station.reader.attach("ACS ACR122U");
    station.reader.tap("ACS ACR122U", &[0x04, 0xA3, 0x9F]);
    let uid = recv_until(&mut ws, |m| matches!(m, StationMsg::Uid { .. })).await;
    send(&mut ws, json!({"type": "Readers", "request_id": 1})).await;
    let readers = reply_value(recv_until(&mut ws, is_reply(1)).await);

    // Assert
    assert_eq!(
        uid,
        StationMsg::Uid {
            uid: "04 A3 9F".to_string()
        }
    );
    assert_eq!(readers, json!(["ACS ACR122U"]));
    station.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_frontend_records_attendance_through_db_channel() {
    // Arrange
    let station = start_station(Platform::Linux).await;
    let mut ws = connect(station.port).await;

    // Act
    send(
        &mut ws,
        json!({"type": "Db", "request_id": 1, "model": "member", "action": "create",
               "data": {"name": "Alice", "uid": "04 A3 9F"}}),
    )
    .await;
    let alice = reply_value(recv_until(&mut ws, is_reply(1)).await);

    send(
        &mut ws,
        json!({"type": "Db", "request_id": 2, "model": "record", "action": "create",
               "data": {"uid": "04 A3 9F", "reader": "ACS ACR122U"}}),
    )
    .await;
    let record = reply_value(recv_until(&mut ws, is_reply(2)).await);

    send(
        &mut ws,
        json!({"type": "Db", "request_id": 3, "model": "record", "action": "findByMember",
               "data": {"member_id": alice["id"]}}),
    )
    .await;
    let history = reply_value(recv_until(&mut ws, is_reply(3)).await);

    // Assert
    assert_eq!(alice["name"], "Alice");
    assert_eq!(record["member_id"], alice["id"]);
    assert_eq!(history.as_array().map(Vec::len), Some(1));
    station.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_unknown_model_answers_null_and_raises_error_dialog() {
    // Arrange
    let station = start_station(Platform::Linux).await;
    let mut ws = connect(station.port).await;

    // Act
    send(
        &mut ws,
        json!({"type": "Db", "request_id": 5, "model": "invoice", "action": "create", "data": {}}),
    )
    .await;
    // Dialog and reply travel different paths, so either may arrive first.
    let mut dialog = None;
    let mut reply = None;
    while dialog.is_none() || reply.is_none() {
        let msg = recv_until(&mut ws, |m| {
            matches!(m, StationMsg::ErrorDialog { .. } | StationMsg::Reply { .. })
        })
        .await;
        match msg {
            StationMsg::ErrorDialog { title, message } => dialog = Some((title, message)),
            other => reply = Some(other),
        }
    }

    // Assert
    let (title, message) = dialog.unwrap();
    assert_eq!(title, "錯誤");
    assert!(message.contains("invoice"));
    let reply = reply.unwrap();
    assert_eq!(reply_value(reply), Value::Null);
    station.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_reinit_on_unsupported_platform_keeps_readers() {
    // Arrange
    let station = start_station(Platform::Windows).await;
    let mut ws = connect(station.port).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    station.reader.attach("ACR122");
    station.reader.tap("ACR122", &[0x01]);
    recv_until(&mut ws, |m| matches!(m, StationMsg::Uid { .. })).await;

    // Act
    send(&mut ws, json!({"type": "ReinitNfc"})).await;
    let dialog = recv_until(&mut ws, |m| matches!(m, StationMsg::ErrorDialog { .. })).await;
    send(&mut ws, json!({"type": "Readers", "request_id": 2})).await;
    let readers = reply_value(recv_until(&mut ws, is_reply(2)).await);

    // Assert
    assert_eq!(
        dialog,
        StationMsg::ErrorDialog {
            title: "錯誤".to_string(),
            message: "Not Supported Platform windows".to_string()
        }
    );
    assert_eq!(readers, json!(["ACR122"]));
    station.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_second_launch_focuses_existing_window() {
    // Arrange: primary holds the lock and forwards notifications
    let station = start_station(Platform::Linux).await;
    let mut ws = connect(station.port).await;
    let lock = match instance_lock::acquire(0).await.unwrap() {
        InstanceRole::Primary(lock) => lock,
        InstanceRole::Secondary => panic!("port 0 is never taken"),
    };
    let lock_port = lock.port().unwrap();
    let events = station.events.clone();
    tokio::spawn(async move {
        while lock.next_notification().await.is_ok() {
            let _ = events.send(StationEvent::SecondInstance);
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Act: a second launch
    let role = instance_lock::acquire(lock_port).await.unwrap();

    // Assert
    assert!(matches!(role, InstanceRole::Secondary));
    let focus = recv_until(&mut ws, |m| {
        matches!(
            m,
            StationMsg::Window {
                command: WindowCommand::Focus
            }
        )
    })
    .await;
    assert!(matches!(focus, StationMsg::Window { .. }));
    station.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_window_closed_ends_event_loop_on_linux() {
    // Arrange
    let station = start_station(Platform::Linux).await;
    let mut ws = connect(station.port).await;

    // Act
    send(&mut ws, json!({"type": "WindowClosed"})).await;

    // Assert
    tokio::time::timeout(Duration::from_secs(5), station.event_loop)
        .await
        .expect("event loop must stop")
        .unwrap();
    assert_eq!(station.reader.stop_count(), 1);
    station.running.store(false, Ordering::Relaxed);
}
