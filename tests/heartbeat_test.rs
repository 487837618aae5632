//! Heartbeat lifecycle and dispatcher delivery, end to end.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pubsub_rs::{
    ClientConfig, HeartbeatNotification, PresenceOperation, StatusCategory, SubscribeOperation,
    SubscriptionManager,
};

use common::{ack, error, wait_until, wire_message, CaptureListener, MockTransport};

fn engine(config: ClientConfig) -> (SubscriptionManager, Arc<MockTransport>, Arc<CaptureListener>) {
    let transport = Arc::new(MockTransport::new());
    let manager = SubscriptionManager::new(config, transport.clone());
    let listener = Arc::new(CaptureListener::new());
    manager.add_listener(listener.clone());
    (manager, transport, listener)
}

fn heartbeat_config() -> ClientConfig {
    ClientConfig::new("ps.example.com", "sub-key")
        .with_suppressed_leave_events()
        .with_heartbeat_interval(1)
        .with_heartbeat_notification(HeartbeatNotification::Failures)
}

#[tokio::test]
async fn test_heartbeats_fire_periodically_until_error() {
    let (manager, transport, listener) = engine(heartbeat_config());

    // first beat succeeds, second fails; the timer must then stop itself
    transport.push_heartbeat(common::ack_status(pubsub_rs::Operation::Heartbeat));
    transport.push_heartbeat(error(StatusCategory::UnexpectedDisconnect, &[]).status);

    manager.subscribe(SubscribeOperation::channels(["a"]));

    wait_until(Duration::from_secs(4), || {
        transport.heartbeat_calls.lock().len() >= 2
    })
    .await;

    // with FAILURES verbosity only the error is announced
    wait_until(Duration::from_secs(1), || {
        listener.statuses.lock().iter().any(|s| s.error)
    })
    .await;

    let beats = transport.heartbeat_calls.lock().len();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(
        transport.heartbeat_calls.lock().len(),
        beats,
        "no further heartbeats after an error"
    );
}

#[tokio::test]
async fn test_builder_operation_restarts_heartbeat() {
    let (manager, transport, _listener) = engine(heartbeat_config());

    transport.push_heartbeat(error(StatusCategory::UnexpectedDisconnect, &[]).status);
    manager.subscribe(SubscribeOperation::channels(["a"]));

    wait_until(Duration::from_secs(3), || {
        !transport.heartbeat_calls.lock().is_empty()
    })
    .await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let stalled = transport.heartbeat_calls.lock().len();

    // a presence builder operation re-registers the timer
    manager.set_presence_connected(PresenceOperation::connected(["hb-only"]));
    wait_until(Duration::from_secs(3), || {
        transport.heartbeat_calls.lock().len() > stalled
    })
    .await;

    // heartbeat-only names join the subscribed set on the call
    let calls = transport.heartbeat_calls.lock();
    let last = calls.last().unwrap();
    assert_eq!(last.0, vec!["a", "hb-only"]);
}

#[tokio::test]
async fn test_messages_flow_to_listener_without_duplicates() {
    let config = ClientConfig::new("ps.example.com", "sub-key").with_suppressed_leave_events();
    let (manager, transport, listener) = engine(config);

    transport.push_subscribe(ack(
        1000,
        "1",
        vec![
            wire_message("lobby", 900, serde_json::json!({"text": "hi"})),
            wire_message("lobby", 900, serde_json::json!({"text": "hi"})),
            wire_message("lobby", 901, serde_json::json!({"text": "again"})),
        ],
    ));
    manager.subscribe(SubscribeOperation::channels(["lobby"]));

    wait_until(Duration::from_secs(2), || listener.messages.lock().len() >= 2).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let messages = listener.messages.lock();
    assert_eq!(messages.len(), 2, "duplicate dropped");
    assert_eq!(messages[0].payload, serde_json::json!({"text": "hi"}));
    assert_eq!(messages[1].payload, serde_json::json!({"text": "again"}));
    assert_eq!(messages[0].timetoken, 900);
}

#[tokio::test]
async fn test_presence_events_are_decoded() {
    let config = ClientConfig::new("ps.example.com", "sub-key").with_suppressed_leave_events();
    let (manager, transport, listener) = engine(config);

    transport.push_subscribe(ack(
        1000,
        "1",
        vec![wire_message(
            "lobby-pnpres",
            950,
            serde_json::json!({"action": "join", "uuid": "u1", "occupancy": 2}),
        )],
    ));
    manager.subscribe(SubscribeOperation::channels(["lobby"]).with_presence());

    wait_until(Duration::from_secs(2), || {
        !listener.presence.lock().is_empty()
    })
    .await;

    let presence = listener.presence.lock();
    assert_eq!(presence[0].channel, "lobby");
    assert_eq!(presence[0].action, "join");
    assert_eq!(presence[0].occupancy, Some(2));
}

#[tokio::test]
async fn test_message_count_threshold_announces() {
    let config = ClientConfig::new("ps.example.com", "sub-key")
        .with_suppressed_leave_events()
        .with_request_message_count_threshold(2);
    let (manager, transport, listener) = engine(config);

    transport.push_subscribe(ack(
        1000,
        "1",
        vec![
            wire_message("lobby", 1, serde_json::json!("one")),
            wire_message("lobby", 2, serde_json::json!("two")),
        ],
    ));
    manager.subscribe(SubscribeOperation::channels(["lobby"]));

    wait_until(Duration::from_secs(2), || {
        listener.count_category(StatusCategory::RequestMessageCountExceeded) == 1
    })
    .await;
}

#[tokio::test]
async fn test_destroy_stops_delivery() {
    let config = ClientConfig::new("ps.example.com", "sub-key").with_suppressed_leave_events();
    let (manager, transport, listener) = engine(config);

    transport.push_subscribe(ack(
        1000,
        "1",
        vec![wire_message("lobby", 1, serde_json::json!("last"))],
    ));
    manager.subscribe(SubscribeOperation::channels(["lobby"]));
    wait_until(Duration::from_secs(2), || !listener.messages.lock().is_empty()).await;

    manager.destroy(true);
    tokio::time::sleep(Duration::from_millis(200)).await;
    let delivered = listener.messages.lock().len();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(listener.messages.lock().len(), delivered);
}
