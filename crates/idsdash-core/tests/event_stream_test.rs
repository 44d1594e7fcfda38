#![allow(clippy::unwrap_used)]
// Registry, fan-out and lifecycle tests for `EventStreamClient` against an
// in-memory push feed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use idsdash_api::events::{PushFrame, PushMessage, PushStatus};
use idsdash_core::{
    CoreError, EventKind, EventStreamClient, Handler, PushConnection, PushConnector, StreamStatus,
};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ── Fake connector ──────────────────────────────────────────────────

#[derive(Default)]
struct FakeConnector {
    connects: AtomicUsize,
    feeds: Mutex<Vec<(mpsc::Sender<PushMessage>, CancellationToken)>>,
}

impl FakeConnector {
    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Sender and stop token of the most recent connection.
    fn latest(&self) -> (mpsc::Sender<PushMessage>, CancellationToken) {
        self.feeds.lock().unwrap().last().cloned().unwrap()
    }
}

impl PushConnector for FakeConnector {
    fn connect(&self) -> Result<PushConnection, CoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (tx, messages) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        self.feeds.lock().unwrap().push((tx, cancel.clone()));
        Ok(PushConnection { messages, cancel })
    }
}

fn setup() -> (Arc<FakeConnector>, EventStreamClient) {
    let connector = Arc::new(FakeConnector::default());
    let client = EventStreamClient::new(connector.clone());
    (connector, client)
}

fn frame(event: &str, data: &str) -> PushMessage {
    PushMessage::Frame(PushFrame {
        event: event.into(),
        data: data.into(),
        id: None,
    })
}

type Log = Arc<Mutex<Vec<String>>>;

fn recorder(log: &Log, name: &'static str) -> Handler {
    let log = Arc::clone(log);
    Arc::new(move |payload: &Value| {
        log.lock().unwrap().push(format!("{name}:{}", payload["id"].as_str().unwrap_or("?")));
    })
}

/// Wait until `log` holds `n` entries.
async fn wait_for(log: &Log, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while log.lock().unwrap().len() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("handlers ran in time");
}

async fn wait_for_status(client: &EventStreamClient, want: StreamStatus) {
    let mut rx = client.watch_status();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == want))
        .await
        .expect("status reached in time")
        .unwrap();
}

// ── Fan-out ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_alert_reaches_only_alert_handlers_in_order_despite_panic() {
    let (connector, client) = setup();
    let log: Log = Arc::default();

    let panicking_log = Arc::clone(&log);
    let first: Handler = Arc::new(move |_: &Value| {
        panicking_log.lock().unwrap().push("first".into());
        panic!("handler failure");
    });
    client.subscribe("alert", first).unwrap();
    client.subscribe("alert", recorder(&log, "second")).unwrap();
    client.subscribe("block", recorder(&log, "block")).unwrap();

    let (tx, _) = connector.latest();
    tx.send(frame("alert", r#"{"id":"a1"}"#)).await.unwrap();
    wait_for(&log, 2).await;

    // a later block frame proves the pump survived the panic
    tx.send(frame("block", r#"{"id":"b1"}"#)).await.unwrap();
    wait_for(&log, 3).await;

    assert_eq!(*log.lock().unwrap(), ["first", "second:a1", "block:b1"]);
    assert_eq!(client.status(), StreamStatus::Connecting);
}

#[tokio::test]
async fn test_malformed_payload_is_dropped() {
    let (connector, client) = setup();
    let log: Log = Arc::default();
    client.subscribe("alert", recorder(&log, "alert")).unwrap();

    let (tx, _) = connector.latest();
    tx.send(frame("alert", "{not json")).await.unwrap();
    tx.send(frame("alert", r#"{"id":"ok"}"#)).await.unwrap();
    wait_for(&log, 1).await;

    assert_eq!(*log.lock().unwrap(), ["alert:ok"]);
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_unknown_category_is_ignored() {
    let (connector, client) = setup();
    let log: Log = Arc::default();
    client.subscribe("alert", recorder(&log, "alert")).unwrap();

    let (tx, _) = connector.latest();
    tx.send(frame("heartbeat", r#"{"id":"h"}"#)).await.unwrap();
    tx.send(frame("alert", r#"{"id":"a"}"#)).await.unwrap();
    wait_for(&log, 1).await;

    assert_eq!(*log.lock().unwrap(), ["alert:a"]);
}

#[tokio::test]
async fn test_duplicate_handler_registers_once() {
    let (connector, client) = setup();
    let log: Log = Arc::default();
    let handler = recorder(&log, "dup");

    let first = client.subscribe("scan", Arc::clone(&handler)).unwrap();
    let second = client.subscribe("scan", handler).unwrap();
    assert_eq!(client.handler_count(), 1);

    let (tx, _) = connector.latest();
    tx.send(frame("scan", r#"{"id":"s1"}"#)).await.unwrap();
    wait_for(&log, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(log.lock().unwrap().len(), 1);

    first.unsubscribe();
    second.unsubscribe();
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_handler_may_unsubscribe_itself() {
    let (connector, client) = setup();
    let log: Log = Arc::default();

    let slot: Arc<Mutex<Option<idsdash_core::Subscription>>> = Arc::default();
    let slot_in_handler = Arc::clone(&slot);
    let log_in_handler = Arc::clone(&log);
    let sub = client
        .on(EventKind::Alert, move |_| {
            log_in_handler.lock().unwrap().push("once".into());
            if let Some(sub) = slot_in_handler.lock().unwrap().take() {
                sub.unsubscribe();
            }
        })
        .unwrap();
    *slot.lock().unwrap() = Some(sub);

    let (tx, cancel) = connector.latest();
    tx.send(frame("alert", "{}")).await.unwrap();
    wait_for(&log, 1).await;

    assert_eq!(client.handler_count(), 0);
    assert!(cancel.is_cancelled());
    assert_eq!(client.status(), StreamStatus::Closed);
}

// ── Connection lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn test_single_subscription_closes_on_unsubscribe() {
    let (connector, client) = setup();
    assert_eq!(client.status(), StreamStatus::Closed);

    let sub = client.on(EventKind::Alert, |_| {}).unwrap();
    assert_eq!(connector.connects(), 1);
    assert!(client.is_connected());

    sub.unsubscribe();
    let (_, cancel) = connector.latest();
    assert!(cancel.is_cancelled());
    assert!(!client.is_connected());
    assert_eq!(client.status(), StreamStatus::Closed);

    // idempotent
    sub.unsubscribe();
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_connection_shared_until_last_unsubscribe() {
    let (connector, client) = setup();
    let a = client.on(EventKind::Alert, |_| {}).unwrap();
    let b = client.on(EventKind::Block, |_| {}).unwrap();
    assert_eq!(connector.connects(), 1);

    a.unsubscribe();
    assert!(client.is_connected());
    let (_, cancel) = connector.latest();
    assert!(!cancel.is_cancelled());

    b.unsubscribe();
    assert!(!client.is_connected());
    assert!(cancel.is_cancelled());

    // a new subscription builds a fresh connection
    let c = client.on(EventKind::Scan, |_| {}).unwrap();
    assert_eq!(connector.connects(), 2);
    c.unsubscribe();
}

#[tokio::test]
async fn test_close_clears_everything() {
    let (connector, client) = setup();
    let a = client.on(EventKind::Alert, |_| {}).unwrap();
    client.on(EventKind::Block, |_| {}).unwrap();

    client.close();
    assert_eq!(client.handler_count(), 0);
    assert!(!client.is_connected());
    assert!(connector.latest().1.is_cancelled());

    // handles from before the close are harmless
    a.unsubscribe();
    assert_eq!(client.status(), StreamStatus::Closed);
}

// ── Status mirroring ────────────────────────────────────────────────

#[tokio::test]
async fn test_transport_status_is_mirrored() {
    let (connector, client) = setup();
    let _sub = client.on(EventKind::Alert, |_| {}).unwrap();
    let (tx, _) = connector.latest();

    tx.send(PushMessage::Status(PushStatus::Open)).await.unwrap();
    wait_for_status(&client, StreamStatus::Open).await;

    tx.send(PushMessage::Status(PushStatus::Reconnecting {
        attempt: 2,
        delay: Duration::from_secs(2),
    }))
    .await
    .unwrap();
    wait_for_status(&client, StreamStatus::Reconnecting { attempt: 2 }).await;
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_degraded_drops_connection_and_reconnect_recovers() {
    let (connector, client) = setup();
    let log: Log = Arc::default();
    client.subscribe("alert", recorder(&log, "alert")).unwrap();
    let (tx, cancel) = connector.latest();

    tx.send(PushMessage::Status(PushStatus::Degraded { attempts: 10 }))
        .await
        .unwrap();
    wait_for_status(&client, StreamStatus::Degraded { attempts: 10 }).await;
    assert!(!client.is_connected());
    assert!(cancel.is_cancelled());
    assert_eq!(client.handler_count(), 1);

    client.reconnect().unwrap();
    assert_eq!(connector.connects(), 2);
    let (tx, _) = connector.latest();
    tx.send(frame("alert", r#"{"id":"again"}"#)).await.unwrap();
    wait_for(&log, 1).await;
    assert_eq!(*log.lock().unwrap(), ["alert:again"]);
}

#[tokio::test]
async fn test_frames_from_replaced_connection_are_ignored() {
    let (connector, client) = setup();
    let log: Log = Arc::default();
    client.subscribe("alert", recorder(&log, "alert")).unwrap();
    let (old_tx, _) = connector.latest();

    client.reconnect().unwrap();
    let (new_tx, _) = connector.latest();

    // the old pump is cancelled; anything it still had is discarded
    let _ = old_tx.send(frame("alert", r#"{"id":"stale"}"#)).await;
    new_tx.send(frame("alert", r#"{"id":"fresh"}"#)).await.unwrap();
    wait_for(&log, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(*log.lock().unwrap(), ["alert:fresh"]);
}

#[tokio::test]
async fn test_status_stream_replays_current_then_changes() {
    use tokio_stream::StreamExt;

    let (connector, client) = setup();
    let mut statuses = client.status_stream();
    assert_eq!(statuses.next().await, Some(StreamStatus::Closed));

    let _sub = client.on(EventKind::Scan, |_| {}).unwrap();
    assert_eq!(statuses.next().await, Some(StreamStatus::Connecting));

    let (tx, _) = connector.latest();
    tx.send(PushMessage::Status(PushStatus::Open)).await.unwrap();
    let next = tokio::time::timeout(Duration::from_secs(5), statuses.next())
        .await
        .unwrap();
    assert_eq!(next, Some(StreamStatus::Open));
}

// ── Dashboard ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_dashboard_reset_drops_subscriptions_and_token() {
    let connector = Arc::new(FakeConnector::default());
    let dashboard =
        idsdash_core::Dashboard::with_connector(idsdash_core::DashboardConfig::default(), connector.clone())
            .unwrap();
    let expires = chrono::Utc::now() + chrono::Duration::hours(1);
    dashboard
        .api()
        .tokens()
        .store(&secrecy::SecretString::from("tok".to_string()), expires);

    let received: Arc<Mutex<Vec<idsdash_core::PushEvent>>> = Arc::default();
    let sink = Arc::clone(&received);
    let subs = dashboard
        .on_events(&[EventKind::Alert, EventKind::Scan], move |event| {
            sink.lock().unwrap().push(event);
        })
        .unwrap();
    assert_eq!(subs.len(), 2);
    assert_eq!(connector.connects(), 1);

    let (tx, _) = connector.latest();
    tx.send(frame("scan", r#"{"status":"running","progress":40}"#))
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while received.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert!(matches!(
        received.lock().unwrap().first(),
        Some(idsdash_core::PushEvent::Scan(s)) if s.progress == 40
    ));

    dashboard.reset();
    assert_eq!(dashboard.events().handler_count(), 0);
    assert_eq!(dashboard.events().status(), StreamStatus::Closed);
    assert!(dashboard.api().tokens().current().is_none());
}
