//! Client configuration.
//!
//! [`ClientConfig`] is a plain struct with a [`Default`] implementation
//! and `with_*` builders. It is read-only once the engine is constructed;
//! builder operations never mutate it.

use std::time::Duration;

use crate::core::error::{PubSubError, Result};

/// How loudly heartbeat results are announced to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeartbeatNotification {
    /// Never announce heartbeat statuses.
    None,
    /// Announce heartbeat failures only.
    #[default]
    Failures,
    /// Announce both successes and failures.
    All,
}

/// Backoff schedule used while polling for connectivity restoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectionPolicy {
    /// Fixed delay between probe attempts.
    Linear,
    /// Exponentially growing delay with jitter, capped at 32 seconds.
    #[default]
    Exponential,
}

/// Configuration for the subscription engine.
///
/// # Example
///
/// ```
/// use pubsub_rs::ClientConfig;
///
/// let config = ClientConfig::new("ps.example.com", "sub-c-demo")
///     .with_heartbeat_interval(30)
///     .with_filter_expression("uuid != 'me'");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host the transport talks to, e.g. `"ps.example.com"`.
    pub origin: String,
    /// Subscribe key identifying the keyset.
    pub subscribe_key: String,
    /// Optional auth key appended to every request.
    pub auth_key: Option<String>,
    /// Whether requests go over HTTPS.
    pub tls_enabled: bool,
    /// Presence heartbeat period in seconds. `0` disables the heartbeat
    /// timer entirely.
    pub heartbeat_interval: u64,
    /// Which heartbeat results are announced to listeners.
    pub heartbeat_notification: HeartbeatNotification,
    /// If set, a status is announced whenever a single subscribe
    /// response carries at least this many messages.
    pub request_message_count_threshold: Option<usize>,
    /// Server-side message filter expression.
    pub filter_expression: Option<String>,
    /// Skip Leave requests on unsubscribe/presence-disconnect.
    pub suppress_leave_events: bool,
    /// Launch the background dispatcher that drains the message queue.
    pub start_dispatcher: bool,
    /// Backoff schedule for connectivity polling after a hard disconnect.
    pub reconnection_policy: ReconnectionPolicy,
    /// Probe attempts before giving up. `None` polls until cancelled.
    pub max_reconnection_attempts: Option<u32>,
    /// Capacity of the duplicate-message filter.
    pub dedup_cache_size: usize,
    /// Timeout applied to the long-poll subscribe request. Must exceed
    /// the server's hold time.
    pub subscribe_timeout: Duration,
    /// Timeout applied to control requests (heartbeat, leave, probe).
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: String::new(),
            subscribe_key: String::new(),
            auth_key: None,
            tls_enabled: true,
            heartbeat_interval: 0,
            heartbeat_notification: HeartbeatNotification::default(),
            request_message_count_threshold: None,
            filter_expression: None,
            suppress_leave_events: false,
            start_dispatcher: true,
            reconnection_policy: ReconnectionPolicy::default(),
            max_reconnection_attempts: Some(10),
            dedup_cache_size: 100,
            subscribe_timeout: Duration::from_secs(310),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given origin and subscribe key.
    pub fn new(origin: impl Into<String>, subscribe_key: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            subscribe_key: subscribe_key.into(),
            ..Default::default()
        }
    }

    /// Set the auth key sent with every request.
    #[must_use]
    pub fn with_auth_key(mut self, auth_key: impl Into<String>) -> Self {
        self.auth_key = Some(auth_key.into());
        self
    }

    /// Set the presence heartbeat period in seconds. `0` disables.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, seconds: u64) -> Self {
        self.heartbeat_interval = seconds;
        self
    }

    /// Set the heartbeat announcement verbosity.
    #[must_use]
    pub fn with_heartbeat_notification(mut self, verbosity: HeartbeatNotification) -> Self {
        self.heartbeat_notification = verbosity;
        self
    }

    /// Announce a status when a response carries at least `count` messages.
    #[must_use]
    pub fn with_request_message_count_threshold(mut self, count: usize) -> Self {
        self.request_message_count_threshold = Some(count);
        self
    }

    /// Set the server-side filter expression.
    #[must_use]
    pub fn with_filter_expression(mut self, expression: impl Into<String>) -> Self {
        self.filter_expression = Some(expression.into());
        self
    }

    /// Suppress Leave requests on unsubscribe.
    #[must_use]
    pub fn with_suppressed_leave_events(mut self) -> Self {
        self.suppress_leave_events = true;
        self
    }

    /// Set the reconnection backoff policy and attempt cap.
    #[must_use]
    pub fn with_reconnection_policy(
        mut self,
        policy: ReconnectionPolicy,
        max_attempts: Option<u32>,
    ) -> Self {
        self.reconnection_policy = policy;
        self.max_reconnection_attempts = max_attempts;
        self
    }

    /// Validate that the configuration can drive a transport.
    pub fn validate(&self) -> Result<()> {
        if self.origin.is_empty() {
            return Err(PubSubError::Config("origin must not be empty".into()));
        }
        if self.subscribe_key.is_empty() {
            return Err(PubSubError::Config(
                "subscribe key must not be empty".into(),
            ));
        }
        Ok(())
    }
}
