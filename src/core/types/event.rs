//! Decoded events delivered to listeners by the dispatcher.

use serde::Deserialize;
use serde_json::Value;

/// A data message, signal, object event, or file event.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Channel the message was published on.
    pub channel: String,
    /// The subscription the message matched (group or wildcard), when
    /// different from `channel`.
    pub subscription_match: Option<String>,
    /// Publisher client id.
    pub publisher: Option<String>,
    /// Timetoken the message was published at.
    pub timetoken: i64,
    /// Raw payload.
    pub payload: Value,
    /// Publisher-supplied metadata.
    pub user_metadata: Option<Value>,
}

/// A decoded presence event from a `-pnpres` mirror channel.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceEvent {
    /// `join`, `leave`, `timeout`, `state-change` or `interval`.
    pub action: String,
    /// Client the event is about. Absent on `interval` summaries.
    #[serde(default)]
    pub uuid: Option<String>,
    /// Channel occupancy after the event.
    #[serde(default)]
    pub occupancy: Option<u64>,
    /// Server-side unix timestamp of the event.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// State blob attached by the client, on `state-change`.
    #[serde(default, rename = "data")]
    pub state: Option<Value>,
    /// Channel the event belongs to (without the presence suffix).
    /// Filled in by the dispatcher, not present on the wire.
    #[serde(skip)]
    pub channel: String,
}
