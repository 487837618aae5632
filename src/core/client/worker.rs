//! Background dispatcher draining the message queue.
//!
//! One task per engine. It blocks on the queue, drops duplicates,
//! classifies each raw message, and fans the decoded event out to the
//! listener registry. The task ends when the queue is closed (engine
//! destroyed) or its handle is aborted (forced destroy).

use parking_lot::Mutex;
use std::sync::Arc;

use crate::core::client::dedup::DuplicationFilter;
use crate::core::client::listener::ListenerRegistry;
use crate::core::types::{MessageEvent, PresenceEvent, SubscribeMessage, PRESENCE_SUFFIX};

/// Wire values of the message-kind discriminator.
const TYPE_SIGNAL: i64 = 1;
const TYPE_OBJECT: i64 = 2;
const TYPE_FILE: i64 = 4;

pub(crate) async fn dispatch_loop(
    queue: async_channel::Receiver<SubscribeMessage>,
    listeners: Arc<ListenerRegistry>,
    dedup: Arc<Mutex<DuplicationFilter>>,
) {
    tracing::debug!("dispatcher started");
    while let Ok(message) = queue.recv().await {
        if dedup.lock().is_duplicate(&message) {
            tracing::debug!(channel = %message.channel, "dropping duplicate message");
            continue;
        }
        dispatch_one(&listeners, message);
    }
    tracing::debug!("dispatcher stopped");
}

fn dispatch_one(listeners: &ListenerRegistry, message: SubscribeMessage) {
    if is_presence(&message) {
        match decode_presence(&message) {
            Some(event) => listeners.announce_presence(&event),
            None => {
                tracing::warn!(channel = %message.channel, "undecodable presence payload")
            }
        }
        return;
    }

    let kind = event_kind(message.message_type);
    let event = to_message_event(message);
    match kind {
        Kind::Signal => listeners.announce_signal(&event),
        Kind::Object => listeners.announce_object(&event),
        Kind::File => listeners.announce_file(&event),
        Kind::Message => listeners.announce_message(&event),
    }
}

enum Kind {
    Message,
    Signal,
    Object,
    File,
}

fn event_kind(message_type: Option<i64>) -> Kind {
    match message_type {
        Some(TYPE_SIGNAL) => Kind::Signal,
        Some(TYPE_OBJECT) => Kind::Object,
        Some(TYPE_FILE) => Kind::File,
        _ => Kind::Message,
    }
}

fn is_presence(message: &SubscribeMessage) -> bool {
    message.channel.ends_with(PRESENCE_SUFFIX)
        || message
            .subscription_match
            .as_deref()
            .is_some_and(|m| m.ends_with(PRESENCE_SUFFIX))
}

fn decode_presence(message: &SubscribeMessage) -> Option<PresenceEvent> {
    let mut event: PresenceEvent = serde_json::from_value(message.payload.clone()).ok()?;
    event.channel = message
        .channel
        .strip_suffix(PRESENCE_SUFFIX)
        .unwrap_or(&message.channel)
        .to_string();
    Some(event)
}

fn to_message_event(message: SubscribeMessage) -> MessageEvent {
    let timetoken = message.publish_timetoken();
    MessageEvent {
        channel: message.channel,
        subscription_match: message.subscription_match,
        publisher: message.publisher,
        timetoken,
        payload: message.payload,
        user_metadata: message.user_metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::listener::EventListener;
    use crate::core::types::Status;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Default)]
    struct Capture {
        messages: Mutex<Vec<MessageEvent>>,
        signals: Mutex<Vec<MessageEvent>>,
        presence: Mutex<Vec<PresenceEvent>>,
    }

    impl EventListener for Capture {
        fn status(&self, _status: &Status) {}
        fn message(&self, message: &MessageEvent) {
            self.messages.lock().push(message.clone());
        }
        fn signal(&self, message: &MessageEvent) {
            self.signals.lock().push(message.clone());
        }
        fn presence(&self, event: &PresenceEvent) {
            self.presence.lock().push(event.clone());
        }
    }

    fn raw(value: serde_json::Value) -> SubscribeMessage {
        serde_json::from_value(value).unwrap()
    }

    async fn run_dispatcher(
        messages: Vec<SubscribeMessage>,
    ) -> Arc<Capture> {
        let capture = Arc::new(Capture::default());
        let listeners = Arc::new(ListenerRegistry::new());
        listeners.add(capture.clone());
        let dedup = Arc::new(Mutex::new(DuplicationFilter::new(100)));

        let (tx, rx) = async_channel::unbounded();
        let handle = tokio::spawn(dispatch_loop(rx, listeners, dedup));
        for message in messages {
            tx.send(message).await.unwrap();
        }
        tx.close();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("dispatcher should stop when the queue closes")
            .unwrap();
        capture
    }

    #[tokio::test]
    async fn test_routes_by_kind() {
        let capture = run_dispatcher(vec![
            raw(json!({"c": "lobby", "d": "plain", "p": {"t": "1"}})),
            raw(json!({"c": "lobby", "d": "ping", "e": 1, "p": {"t": "2"}})),
            raw(json!({
                "c": "lobby-pnpres",
                "d": {"action": "join", "uuid": "u1", "occupancy": 1},
                "p": {"t": "3"}
            })),
        ])
        .await;

        assert_eq!(capture.messages.lock().len(), 1);
        assert_eq!(capture.signals.lock().len(), 1);
        let presence = capture.presence.lock();
        assert_eq!(presence.len(), 1);
        assert_eq!(presence[0].channel, "lobby");
        assert_eq!(presence[0].action, "join");
    }

    #[tokio::test]
    async fn test_duplicates_are_dropped() {
        let msg = raw(json!({"c": "lobby", "d": "same", "p": {"t": "7"}}));
        let capture = run_dispatcher(vec![msg.clone(), msg.clone(), msg]).await;
        assert_eq!(capture.messages.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_presence_payload_is_skipped() {
        let capture = run_dispatcher(vec![raw(json!({
            "c": "lobby-pnpres",
            "d": "not a presence object",
            "p": {"t": "9"}
        }))])
        .await;
        assert!(capture.presence.lock().is_empty());
        assert!(capture.messages.lock().is_empty());
    }
}
