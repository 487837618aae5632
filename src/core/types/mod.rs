//! Core data types for the publish/subscribe client.
//!
//! # Overview
//!
//! The engine keeps a long-running, resumable message stream over an
//! HTTP long-poll transport. These types model the three surfaces that
//! meet in the subscribe loop:
//!
//! - **Builder operations**: what the caller asks for
//! - **Wire envelope**: what the server returns
//! - **Events**: what listeners receive
//!
//! # Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Status`] / [`StatusCategory`] | Lifecycle events and loop routing |
//! | [`SubscribeEnvelope`] | Decoded long-poll response (cursor + messages) |
//! | [`SubscribeMessage`] | Raw message handed to the dispatcher |
//! | [`MessageEvent`] / [`PresenceEvent`] | Decoded listener payloads |
//! | [`SubscribeOperation`] … [`StateOperation`] | Facade mutations |

mod envelope;
mod event;
mod operation;
mod status;

pub use envelope::{SubscribeCursor, SubscribeEnvelope, SubscribeMessage};
pub use event::{MessageEvent, PresenceEvent};
pub use operation::{PresenceOperation, StateOperation, SubscribeOperation, UnsubscribeOperation};
pub use status::{Operation, Status, StatusCategory};

/// Suffix of the synthetic channels that carry presence events.
pub const PRESENCE_SUFFIX: &str = "-pnpres";

/// The presence mirror name for a channel or group.
pub fn presence_mirror(name: &str) -> String {
    format!("{name}{PRESENCE_SUFFIX}")
}
