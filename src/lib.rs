//! # pubsub-rs
//!
//! A publish/subscribe client that keeps a long-running, resumable
//! stream of messages and presence events over an HTTP long-poll
//! transport.
//!
//! The engine keeps one subscribe long-poll in flight for the current
//! channel/group mix, delivers messages in order without duplicates,
//! emits lifecycle statuses to registered listeners, sustains presence
//! with periodic heartbeats, and recovers from transient network and
//! server failures with backoff polling.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pubsub_rs::{
//!     ClientConfig, EventListener, MessageEvent, Status, SubscribeOperation,
//!     SubscriptionManager,
//! };
//!
//! struct Printer;
//!
//! impl EventListener for Printer {
//!     fn status(&self, status: &Status) {
//!         println!("status: {:?}", status.category);
//!     }
//!     fn message(&self, message: &MessageEvent) {
//!         println!("{}: {}", message.channel, message.payload);
//!     }
//! }
//!
//! # async fn run() -> pubsub_rs::Result<()> {
//! let manager = SubscriptionManager::with_default_transport(
//!     ClientConfig::new("ps.example.com", "sub-c-demo"),
//! )?;
//! manager.add_listener(Arc::new(Printer));
//! manager.subscribe(SubscribeOperation::channels(["lobby"]).with_presence());
//! # Ok(())
//! # }
//! ```

pub mod core;

pub use crate::core::{
    ClientConfig, EventListener, HeartbeatNotification, HttpTransport, ListenerRegistry,
    MessageEvent, Operation, PresenceEvent, PresenceOperation, PubSubError, ReconnectionPolicy,
    Result, StateOperation, Status, StatusCategory, SubscribeCursor, SubscribeEnvelope,
    SubscribeMessage, SubscribeOperation, SubscribeOutcome, SubscribeRequest,
    SubscriptionManager, Transport, UnsubscribeOperation,
};
