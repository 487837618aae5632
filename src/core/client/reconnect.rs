//! Connectivity restoration after hard disconnects and soft errors.
//!
//! [`ReconnectionManager`] polls a low-cost probe endpoint on a backoff
//! schedule until the origin answers or the attempt cap is reached.
//! [`DelayedReconnectionManager`] is the one-shot short-delay variant
//! used for soft errors. Both report through [`ReconnectionListener`],
//! the seam that lets them re-enter the engine without owning it.

use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::core::config::ReconnectionPolicy;
use crate::core::transport::Transport;

/// Callbacks into the engine. Injected at construction; implementations
/// hold a weak reference back to the facade.
pub(crate) trait ReconnectionListener: Send + Sync {
    /// Connectivity is back (or the soft-error delay elapsed).
    fn on_reconnection(&self);

    /// The probe schedule ran out of attempts.
    fn on_max_reconnection_exhaustion(&self);
}

/// Probe schedule parameters.
#[derive(Debug, Clone)]
pub(crate) struct BackoffSchedule {
    pub policy: ReconnectionPolicy,
    /// `None` polls until cancelled.
    pub max_attempts: Option<u32>,
    /// Delay before the first probe; the unit the schedule grows from.
    pub base_delay: Duration,
    /// Cap on the exponential growth.
    pub max_delay: Duration,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            policy: ReconnectionPolicy::default(),
            max_attempts: Some(10),
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(32),
        }
    }
}

impl BackoffSchedule {
    /// Delay before probe number `attempt` (1-based), jittered by up to
    /// a quarter of the computed value so clients do not stampede.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = match self.policy {
            ReconnectionPolicy::Linear => self.base_delay,
            ReconnectionPolicy::Exponential => {
                let exp = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                exp.min(self.max_delay)
            }
        };
        let jitter_cap = (base.as_millis() as u64 / 4).max(1);
        base + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_cap))
    }
}

/// Polls the probe endpoint until connectivity is restored.
pub(crate) struct ReconnectionManager {
    schedule: BackoffSchedule,
    transport: Arc<dyn Transport>,
    listener: Arc<dyn ReconnectionListener>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReconnectionManager {
    pub fn new(
        schedule: BackoffSchedule,
        transport: Arc<dyn Transport>,
        listener: Arc<dyn ReconnectionListener>,
    ) -> Self {
        Self {
            schedule,
            transport,
            listener,
            handle: Mutex::new(None),
        }
    }

    /// Begin polling. Any poll already in flight is cancelled first.
    pub fn start_polling(&self) {
        let schedule = self.schedule.clone();
        let transport = self.transport.clone();
        let listener = self.listener.clone();

        let task = tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                if let Some(max) = schedule.max_attempts {
                    if attempt > max {
                        tracing::warn!(attempts = max, "reconnection attempts exhausted");
                        listener.on_max_reconnection_exhaustion();
                        return;
                    }
                }

                let delay = schedule.delay_for(attempt);
                tracing::debug!(attempt, ?delay, "scheduling connectivity probe");
                tokio::time::sleep(delay).await;

                match transport.probe().await {
                    Ok(()) => {
                        tracing::info!(attempt, "connectivity restored");
                        listener.on_reconnection();
                        return;
                    }
                    Err(e) => {
                        tracing::debug!(attempt, error = %e, "probe failed");
                    }
                }
            }
        });

        if let Some(previous) = self.handle.lock().replace(task) {
            previous.abort();
        }
    }

    /// Cancel polling. Safe to call when idle.
    pub fn stop(&self) {
        if let Some(task) = self.handle.lock().take() {
            task.abort();
        }
    }
}

impl Drop for ReconnectionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One-shot fixed-delay re-entry for soft errors.
///
/// Only one delayed reconnection can be pending; scheduling another
/// replaces it.
pub(crate) struct DelayedReconnectionManager {
    delay: Duration,
    listener: Arc<dyn ReconnectionListener>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DelayedReconnectionManager {
    pub fn new(delay: Duration, listener: Arc<dyn ReconnectionListener>) -> Self {
        Self {
            delay,
            listener,
            handle: Mutex::new(None),
        }
    }

    pub fn schedule(&self) {
        let delay = self.delay;
        let listener = self.listener.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            listener.on_reconnection();
        });

        if let Some(previous) = self.handle.lock().replace(task) {
            previous.abort();
        }
    }

    pub fn stop(&self) {
        if let Some(task) = self.handle.lock().take() {
            task.abort();
        }
    }
}

impl Drop for DelayedReconnectionManager {
    fn drop(&mut self) {
        self.stop();
    }
}
