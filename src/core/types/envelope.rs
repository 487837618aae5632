//! Wire model of the subscribe envelope.
//!
//! A long-poll response decodes to a [`SubscribeEnvelope`]: a cursor
//! (`t`) that the next request resumes from, and a batch of messages
//! (`m`) in server order. Field names on the wire are single letters;
//! serde renames keep the Rust side readable.
//!
//! ```json
//! {
//!   "t": { "t": "15628652479932717", "r": 4 },
//!   "m": [ { "c": "lobby", "d": {"text": "hi"}, "p": {"t": "...", "r": 4} } ]
//! }
//! ```

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Cursor metadata accompanying every subscribe response.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeCursor {
    /// Timetoken to resume from. Sent as a decimal string on the wire.
    #[serde(rename = "t", deserialize_with = "timetoken_from_wire")]
    pub timetoken: i64,
    /// Opaque region token pinning the cursor to a shard.
    #[serde(rename = "r", default, deserialize_with = "region_from_wire")]
    pub region: Option<String>,
}

/// One decoded subscribe response.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeEnvelope {
    #[serde(rename = "t")]
    pub cursor: SubscribeCursor,
    #[serde(rename = "m", default)]
    pub messages: Vec<SubscribeMessage>,
}

/// A single raw message from a subscribe envelope.
///
/// Carried through the message queue untouched; the dispatcher decodes
/// presence payloads and classifies by [`message_type`](Self::message_type)
/// when draining.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeMessage {
    /// Channel the message was published on.
    #[serde(rename = "c")]
    pub channel: String,
    /// The name the subscription matched on: the channel group or
    /// wildcard pattern, when different from `channel`.
    #[serde(rename = "b", default)]
    pub subscription_match: Option<String>,
    /// Raw payload.
    #[serde(rename = "d")]
    pub payload: Value,
    /// Kind discriminator: absent/0 message, 1 signal, 2 object, 4 file.
    #[serde(rename = "e", default)]
    pub message_type: Option<i64>,
    /// Publisher client id.
    #[serde(rename = "i", default)]
    pub publisher: Option<String>,
    /// Cursor at which the message was published.
    #[serde(rename = "p", default)]
    pub publish_cursor: Option<SubscribeCursor>,
    /// Publisher-supplied metadata, used by filter expressions.
    #[serde(rename = "u", default)]
    pub user_metadata: Option<Value>,
}

impl SubscribeMessage {
    /// Timetoken the message was published at, `0` when absent.
    pub fn publish_timetoken(&self) -> i64 {
        self.publish_cursor.as_ref().map_or(0, |c| c.timetoken)
    }
}

fn timetoken_from_wire<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    // Servers send the 17-digit timetoken as a string to dodge JSON
    // number precision limits; older ones send a bare number.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Text(String),
        Number(i64),
    }

    match Wire::deserialize(deserializer)? {
        Wire::Text(s) => s.parse::<i64>().map_err(serde::de::Error::custom),
        Wire::Number(n) => Ok(n),
    }
}

fn region_from_wire<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Wire>::deserialize(deserializer)?.map(|w| match w {
        Wire::Text(s) => s,
        Wire::Number(n) => n.to_string(),
    }))
}
