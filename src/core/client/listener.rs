//! User-registered listeners and the announce fan-out.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::core::types::{MessageEvent, PresenceEvent, Status};

/// Callbacks a subscriber can register.
///
/// Every method has a no-op default so implementors override only the
/// event kinds they care about. Callbacks are invoked synchronously from
/// the engine's dispatcher and response handlers and must not block.
#[allow(unused_variables)]
pub trait EventListener: Send + Sync {
    /// Lifecycle status events (connected, disconnected, errors).
    fn status(&self, status: &Status) {}

    /// Data messages.
    fn message(&self, message: &MessageEvent) {}

    /// Presence events from `-pnpres` mirror channels.
    fn presence(&self, event: &PresenceEvent) {}

    /// Lightweight signals.
    fn signal(&self, message: &MessageEvent) {}

    /// App-context (object) change events.
    fn object(&self, message: &MessageEvent) {}

    /// File upload notifications.
    fn file(&self, message: &MessageEvent) {}
}

/// Registration-ordered set of listeners.
///
/// Announcing snapshots the current set, so listeners may add or remove
/// listeners (including themselves) from inside a callback without
/// observing torn state.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().push(listener);
    }

    /// Remove a previously added listener. Identity is pointer equality
    /// on the `Arc`.
    pub fn remove(&self, listener: &Arc<dyn EventListener>) {
        self.listeners
            .write()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    fn snapshot(&self) -> Vec<Arc<dyn EventListener>> {
        self.listeners.read().clone()
    }

    pub fn announce_status(&self, status: &Status) {
        tracing::debug!(category = ?status.category, error = status.error, "announcing status");
        for listener in self.snapshot() {
            listener.status(status);
        }
    }

    pub fn announce_message(&self, message: &MessageEvent) {
        for listener in self.snapshot() {
            listener.message(message);
        }
    }

    pub fn announce_presence(&self, event: &PresenceEvent) {
        for listener in self.snapshot() {
            listener.presence(event);
        }
    }

    pub fn announce_signal(&self, message: &MessageEvent) {
        for listener in self.snapshot() {
            listener.signal(message);
        }
    }

    pub fn announce_object(&self, message: &MessageEvent) {
        for listener in self.snapshot() {
            listener.object(message);
        }
    }

    pub fn announce_file(&self, message: &MessageEvent) {
        for listener in self.snapshot() {
            listener.file(message);
        }
    }
}
