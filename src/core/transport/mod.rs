//! Transport contracts consumed by the subscription engine.
//!
//! The engine never builds HTTP requests itself; it drives a
//! [`Transport`] and routes on the [`Status`] each call produces. The
//! production implementation is [`HttpTransport`]; tests substitute a
//! scripted mock.
//!
//! Cancellation is silent by construction: dropping the future of an
//! in-flight call must not surface a status anywhere.

mod http;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::error::Result;
use crate::core::types::{Status, SubscribeEnvelope};

pub use http::HttpTransport;

/// Parameters of one subscribe long-poll.
#[derive(Debug, Clone, Default)]
pub struct SubscribeRequest {
    pub channels: Vec<String>,
    pub channel_groups: Vec<String>,
    /// Cursor to resume from; `0` asks the server for "now".
    pub timetoken: i64,
    pub region: Option<String>,
    pub filter_expression: Option<String>,
    /// Per-channel/group state blobs riding along with the request.
    pub state: BTreeMap<String, Value>,
}

/// Completion of one subscribe long-poll.
///
/// `envelope` is present iff `status.error` is false.
#[derive(Debug, Clone)]
pub struct SubscribeOutcome {
    pub envelope: Option<SubscribeEnvelope>,
    pub status: Status,
}

/// The endpoints the engine consumes.
///
/// Every call resolves to a [`Status`]; errors are carried in-band so
/// the subscribe loop can dispatch on category rather than unwind.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a long-poll for the given channel/group mix and cursor.
    async fn subscribe(&self, request: SubscribeRequest) -> SubscribeOutcome;

    /// Announce presence on the given names.
    async fn heartbeat(&self, channels: &[String], channel_groups: &[String]) -> Status;

    /// Release server-side presence on the given names.
    async fn leave(&self, channels: &[String], channel_groups: &[String]) -> Status;

    /// Low-cost connectivity probe. `Ok` means the origin is reachable.
    async fn probe(&self) -> Result<()>;
}
