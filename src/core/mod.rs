//! Publish/subscribe client core.
//!
//! A long-running, resumable message stream over an HTTP long-poll
//! transport:
//!
//! - **Ordered, de-duplicated delivery** on a named channel/group mix
//! - **Cursor resumption** across responses and channel-mix changes
//! - **Presence** via heartbeats and `-pnpres` mirror channels
//! - **Recovery** from transient network and server failures
//!
//! # Modules
//!
//! - [`client`] - subscribe loop, registry, dispatcher, timers
//! - [`transport`] - endpoint contracts and the HTTP implementation
//! - [`types`] - operations, wire envelope, statuses, events
//! - [`config`] - engine configuration
//! - [`error`] - error type and result alias
//!
//! # Quick Start
//!
//! ```ignore
//! use crate::core::{ClientConfig, SubscribeOperation, SubscriptionManager};
//!
//! let manager = SubscriptionManager::with_default_transport(
//!     ClientConfig::new("ps.example.com", "sub-c-demo"),
//! )?;
//! manager.add_listener(my_listener);
//! manager.subscribe(SubscribeOperation::channels(["lobby"]).with_presence());
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;

// Re-export commonly used types at crate root
pub use client::{EventListener, ListenerRegistry, SubscriptionManager};
pub use config::{ClientConfig, HeartbeatNotification, ReconnectionPolicy};
pub use error::{PubSubError, Result};
pub use transport::{HttpTransport, SubscribeOutcome, SubscribeRequest, Transport};
pub use types::{
    MessageEvent, Operation, PresenceEvent, PresenceOperation, StateOperation, Status,
    StatusCategory, SubscribeCursor, SubscribeEnvelope, SubscribeMessage, SubscribeOperation,
    UnsubscribeOperation,
};
