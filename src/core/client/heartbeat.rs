//! Periodic presence heartbeats.
//!
//! One timer task while the engine is connected. Each firing snapshots
//! the heartbeat target set (subscribed names plus heartbeat-only names)
//! and issues a single heartbeat call; announcement of the result
//! follows the configured verbosity. On any heartbeat error the timer
//! stops itself and stays stopped until the next builder operation
//! re-registers it.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::client::listener::ListenerRegistry;
use crate::core::client::registry::SubscriptionRegistry;
use crate::core::config::HeartbeatNotification;
use crate::core::transport::Transport;

/// Owns the heartbeat timer task. At most one task runs at a time.
pub(crate) struct HeartbeatTimer {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatTimer {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// (Re)start the timer. A zero period stops it instead.
    pub fn register(
        &self,
        period: Duration,
        verbosity: HeartbeatNotification,
        transport: Arc<dyn Transport>,
        registry: Arc<Mutex<SubscriptionRegistry>>,
        listeners: Arc<ListenerRegistry>,
    ) {
        self.stop();

        if period.is_zero() {
            return;
        }

        let task = tokio::spawn(heartbeat_loop(
            period, verbosity, transport, registry, listeners,
        ));
        *self.handle.lock() = Some(task);
    }

    pub fn stop(&self) {
        if let Some(task) = self.handle.lock().take() {
            task.abort();
        }
    }
}

impl Drop for HeartbeatTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn heartbeat_loop(
    period: Duration,
    verbosity: HeartbeatNotification,
    transport: Arc<dyn Transport>,
    registry: Arc<Mutex<SubscriptionRegistry>>,
    listeners: Arc<ListenerRegistry>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let (channels, groups) = {
            let registry = registry.lock();
            (registry.heartbeat_channels(), registry.heartbeat_groups())
        };
        if channels.is_empty() && groups.is_empty() {
            continue;
        }

        let status = transport.heartbeat(&channels, &groups).await;
        if status.error {
            tracing::warn!(code = status.status_code, "heartbeat failed, stopping timer");
            if matches!(
                verbosity,
                HeartbeatNotification::Failures | HeartbeatNotification::All
            ) {
                listeners.announce_status(&status);
            }
            // no automatic retry; the next builder operation restarts us
            return;
        }
        if verbosity == HeartbeatNotification::All {
            listeners.announce_status(&status);
        }
    }
}
