//! Shared helpers for the integration suite: a scripted transport and a
//! capturing listener.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use pubsub_rs::{
    MessageEvent, PresenceEvent, Status, StatusCategory, SubscribeCursor, SubscribeEnvelope,
    SubscribeMessage, SubscribeOutcome, SubscribeRequest, Transport,
};
use pubsub_rs::{EventListener, Operation, PubSubError};

/// Transport driven by a script of canned outcomes.
///
/// Each subscribe call records its request and pops the next scripted
/// outcome; with an empty script the call parks forever, imitating a
/// long-poll the server is holding open. Cancellation drops the parked
/// future silently, exactly like the real transport.
#[derive(Default)]
pub struct MockTransport {
    subscribe_script: Mutex<VecDeque<SubscribeOutcome>>,
    heartbeat_script: Mutex<VecDeque<Status>>,
    probe_script: Mutex<VecDeque<bool>>,
    pub subscribe_requests: Mutex<Vec<SubscribeRequest>>,
    pub heartbeat_calls: Mutex<Vec<(Vec<String>, Vec<String>)>>,
    pub leave_calls: Mutex<Vec<(Vec<String>, Vec<String>)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_subscribe(&self, outcome: SubscribeOutcome) {
        self.subscribe_script.lock().push_back(outcome);
    }

    pub fn push_heartbeat(&self, status: Status) {
        self.heartbeat_script.lock().push_back(status);
    }

    /// Queue a probe result; `true` means the origin is reachable.
    pub fn push_probe(&self, reachable: bool) {
        self.probe_script.lock().push_back(reachable);
    }

    pub fn request_count(&self) -> usize {
        self.subscribe_requests.lock().len()
    }

    pub fn request_timetokens(&self) -> Vec<i64> {
        self.subscribe_requests
            .lock()
            .iter()
            .map(|r| r.timetoken)
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn subscribe(&self, request: SubscribeRequest) -> SubscribeOutcome {
        self.subscribe_requests.lock().push(request);
        let scripted = self.subscribe_script.lock().pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => futures::future::pending::<SubscribeOutcome>().await,
        }
    }

    async fn heartbeat(&self, channels: &[String], channel_groups: &[String]) -> Status {
        self.heartbeat_calls
            .lock()
            .push((channels.to_vec(), channel_groups.to_vec()));
        self.heartbeat_script
            .lock()
            .pop_front()
            .unwrap_or_else(|| ack_status(Operation::Heartbeat))
    }

    async fn leave(&self, channels: &[String], channel_groups: &[String]) -> Status {
        self.leave_calls
            .lock()
            .push((channels.to_vec(), channel_groups.to_vec()));
        ack_status(Operation::Leave)
    }

    async fn probe(&self) -> pubsub_rs::Result<()> {
        match self.probe_script.lock().pop_front() {
            Some(true) | None => Ok(()),
            Some(false) => Err(PubSubError::Timeout),
        }
    }
}

/// Listener that records everything it hears.
#[derive(Default)]
pub struct CaptureListener {
    pub statuses: Mutex<Vec<Status>>,
    pub messages: Mutex<Vec<MessageEvent>>,
    pub signals: Mutex<Vec<MessageEvent>>,
    pub presence: Mutex<Vec<PresenceEvent>>,
}

impl CaptureListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(&self) -> Vec<StatusCategory> {
        self.statuses.lock().iter().map(|s| s.category).collect()
    }

    pub fn count_category(&self, category: StatusCategory) -> usize {
        self.statuses
            .lock()
            .iter()
            .filter(|s| s.category == category)
            .count()
    }
}

impl EventListener for CaptureListener {
    fn status(&self, status: &Status) {
        self.statuses.lock().push(status.clone());
    }
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

pub fn ack_status(operation: Operation) -> Status {
    let mut status = Status::new(StatusCategory::Acknowledgment, false);
    status.status_code = 200;
    status.operation = Some(operation);
    status
}

/// Successful subscribe outcome with the given cursor and messages.
pub fn ack(timetoken: i64, region: &str, messages: Vec<SubscribeMessage>) -> SubscribeOutcome {
    SubscribeOutcome {
        envelope: Some(SubscribeEnvelope {
            cursor: SubscribeCursor {
                timetoken,
                region: Some(region.to_string()),
            },
            messages,
        }),
        status: ack_status(Operation::Subscribe),
    }
}

/// Successful outcome whose status names recovered channels.
pub fn ack_with_affected(
    timetoken: i64,
    region: &str,
    affected_channels: &[&str],
) -> SubscribeOutcome {
    let mut outcome = ack(timetoken, region, Vec::new());
    outcome.status.affected_channels =
        affected_channels.iter().map(|s| s.to_string()).collect();
    outcome
}

/// Failed subscribe outcome of the given category.
pub fn error(category: StatusCategory, affected_channels: &[&str]) -> SubscribeOutcome {
    let mut status = Status::new(category, true);
    status.operation = Some(Operation::Subscribe);
    status.affected_channels = affected_channels.iter().map(|s| s.to_string()).collect();
    SubscribeOutcome {
        envelope: None,
        status,
    }
}

/// Raw wire message for scripted envelopes.
pub fn wire_message(channel: &str, timetoken: i64, payload: serde_json::Value) -> SubscribeMessage {
    serde_json::from_value(serde_json::json!({
        "c": channel,
        "d": payload,
        "p": {"t": timetoken.to_string()}
    }))
    .unwrap()
}

/// Poll until `condition` holds or the deadline passes.
pub async fn wait_until<F>(timeout: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
