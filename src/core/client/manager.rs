//! The subscription manager facade and the subscribe loop.
//!
//! The manager wires the registry, dedup filter, dispatcher, heartbeat
//! timer, and reconnection controllers together and owns the loop state
//! (cursor, connected flag, outstanding task handles). Builder
//! operations mutate the registry and restart the loop; the loop itself
//! runs as a single spawned task that issues one long-poll at a time and
//! re-plans from current state after every completion, so no stack is
//! built across iterations.
//!
//! # Locking
//!
//! Two locks: the loop-state lock and the registry lock. When both are
//! needed the registry lock nests inside the state lock, and no guard is
//! ever held across an await.
//!
//! # Cancellation
//!
//! Every restart bumps an epoch counter and aborts the previous loop
//! task. Aborting drops the in-flight long-poll at its await point, so a
//! cancelled call can never surface a status. A stale task that already
//! left its await re-checks the epoch before touching state.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::core::client::dedup::DuplicationFilter;
use crate::core::client::heartbeat::HeartbeatTimer;
use crate::core::client::listener::{EventListener, ListenerRegistry};
use crate::core::client::reconnect::{
    BackoffSchedule, DelayedReconnectionManager, ReconnectionListener, ReconnectionManager,
};
use crate::core::client::registry::SubscriptionRegistry;
use crate::core::client::worker;
use crate::core::config::ClientConfig;
use crate::core::error::Result;
use crate::core::transport::{HttpTransport, SubscribeOutcome, SubscribeRequest, Transport};
use crate::core::types::{
    PresenceOperation, StateOperation, Status, StatusCategory, SubscribeEnvelope,
    SubscribeMessage, SubscribeOperation, UnsubscribeOperation,
};

/// Delay before retrying when every subscribed name is parked, and
/// before re-entering the loop after a soft error.
const SOFT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Cursor and task state owned by the subscribe loop.
struct LoopState {
    /// Whether the loop should be running.
    connected: bool,
    /// Cursor for the next long-poll; `0` means "start at now" and emit
    /// a connected event on the first response.
    timetoken: i64,
    /// Cursor preserved across a channel-mix change, restored after the
    /// first successful response on the new mix. Never zero while set.
    stored_timetoken: Option<i64>,
    /// Opaque shard token accompanying the timetoken.
    region: Option<String>,
    /// Whether the current mix episode has emitted its connected status.
    status_announced: bool,
    /// Bumped on every loop restart/stop; stale tasks compare against it.
    epoch: u64,
    subscribe_task: Option<JoinHandle<()>>,
    dispatcher_task: Option<JoinHandle<()>>,
}

impl LoopState {
    fn new() -> Self {
        Self {
            connected: false,
            timetoken: 0,
            stored_timetoken: None,
            region: None,
            status_announced: false,
            epoch: 0,
            subscribe_task: None,
            dispatcher_task: None,
        }
    }
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    registry: Arc<Mutex<SubscriptionRegistry>>,
    listeners: Arc<ListenerRegistry>,
    dedup: Arc<Mutex<DuplicationFilter>>,
    queue_tx: async_channel::Sender<SubscribeMessage>,
    heartbeat: HeartbeatTimer,
    reconnection: ReconnectionManager,
    delayed_reconnection: DelayedReconnectionManager,
    state: Mutex<LoopState>,
}

/// What the loop task should do next.
enum Directive {
    Continue,
    Stop,
}

/// Next step decided from current registry and loop state.
enum Plan {
    Stop,
    Sleep,
    Request(SubscribeRequest),
}

/// Re-entry hooks handed to both reconnection controllers.
///
/// Holds a weak reference so the controllers never keep the engine
/// alive; the facade owns everything.
struct EngineHooks {
    inner: Weak<Inner>,
}

impl ReconnectionListener for EngineHooks {
    fn on_reconnection(&self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        Inner::reconnect(&inner);

        let (channels, groups) = {
            let registry = inner.registry.lock();
            (registry.target_channels(true), registry.target_groups(true))
        };
        let mut status = Status::new(StatusCategory::Reconnected, false);
        status.affected_channels = channels;
        status.affected_channel_groups = groups;

        inner.state.lock().status_announced = true;
        inner.listeners.announce_status(&status);
    }

    fn on_max_reconnection_exhaustion(&self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let (channels, groups) = {
            let registry = inner.registry.lock();
            (registry.target_channels(true), registry.target_groups(true))
        };
        let mut status = Status::new(StatusCategory::ReconnectionAttemptsExhausted, false);
        status.affected_channels = channels;
        status.affected_channel_groups = groups;
        inner.listeners.announce_status(&status);

        inner.disconnect();
    }
}

/// The subscription engine facade.
///
/// Serializes builder mutations, owns every timer and outstanding call,
/// and keeps one subscribe long-poll in flight while connected.
///
/// Must be created and used inside a tokio runtime.
///
/// # Example
///
/// ```no_run
/// use pubsub_rs::{ClientConfig, SubscribeOperation, SubscriptionManager};
///
/// # async fn example() -> pubsub_rs::Result<()> {
/// let manager = SubscriptionManager::with_default_transport(
///     ClientConfig::new("ps.example.com", "sub-c-demo"),
/// )?;
/// manager.subscribe(SubscribeOperation::channels(["lobby"]).with_presence());
/// # Ok(())
/// # }
/// ```
pub struct SubscriptionManager {
    inner: Arc<Inner>,
}

impl SubscriptionManager {
    /// Create an engine over the given transport.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let (queue_tx, queue_rx) = async_channel::unbounded();
        let registry = Arc::new(Mutex::new(SubscriptionRegistry::new()));
        let listeners = Arc::new(ListenerRegistry::new());
        let dedup = Arc::new(Mutex::new(DuplicationFilter::new(config.dedup_cache_size)));

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let hooks: Arc<dyn ReconnectionListener> = Arc::new(EngineHooks {
                inner: weak.clone(),
            });
            let schedule = BackoffSchedule {
                policy: config.reconnection_policy,
                max_attempts: config.max_reconnection_attempts,
                ..Default::default()
            };
            Inner {
                reconnection: ReconnectionManager::new(
                    schedule,
                    transport.clone(),
                    hooks.clone(),
                ),
                delayed_reconnection: DelayedReconnectionManager::new(SOFT_RETRY_DELAY, hooks),
                heartbeat: HeartbeatTimer::new(),
                config,
                transport,
                registry,
                listeners,
                dedup,
                queue_tx,
                state: Mutex::new(LoopState::new()),
            }
        });

        if inner.config.start_dispatcher {
            let task = tokio::spawn(worker::dispatch_loop(
                queue_rx,
                inner.listeners.clone(),
                inner.dedup.clone(),
            ));
            inner.state.lock().dispatcher_task = Some(task);
        }

        Self { inner }
    }

    /// Create an engine over the built-in HTTP transport.
    pub fn with_default_transport(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.clone())?);
        Ok(Self::new(config, transport))
    }

    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.inner.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn EventListener>) {
        self.inner.listeners.remove(listener);
    }

    /// Subscribe to channels/groups and restart the loop.
    ///
    /// The current cursor is preserved across the mix change and
    /// restored after the first successful response, so messages
    /// published while the change settles are replayed.
    pub fn subscribe(&self, op: SubscribeOperation) {
        let inner = &self.inner;
        tracing::info!(channels = ?op.channels, groups = ?op.channel_groups, "subscribe");
        inner.registry.lock().apply_subscribe(&op);
        inner.dedup.lock().clear();

        {
            let mut state = inner.state.lock();
            // the mix changed; the next successful response announces
            state.status_announced = false;
            if let Some(timetoken) = op.timetoken {
                state.timetoken = timetoken;
            }
            if state.timetoken != 0 {
                state.stored_timetoken = Some(state.timetoken);
            }
            state.timetoken = 0;
        }

        Inner::reconnect(inner);
    }

    /// Unsubscribe from channels/groups, optionally dispatching a Leave,
    /// and restart the loop.
    pub fn unsubscribe(&self, op: UnsubscribeOperation) {
        let inner = &self.inner;
        tracing::info!(channels = ?op.channels, groups = ?op.channel_groups, "unsubscribe");
        inner.registry.lock().apply_unsubscribe(&op);
        inner.dedup.lock().clear();

        if !inner.config.suppress_leave_events {
            let transport = inner.transport.clone();
            let listeners = inner.listeners.clone();
            let channels = op.channels.clone();
            let groups = op.channel_groups.clone();
            tokio::spawn(async move {
                let status = transport.leave(&channels, &groups).await;
                // the caller asked for this; denial is not worth echoing
                if status.error && status.category == StatusCategory::AccessDenied {
                    return;
                }
                listeners.announce_status(&status);
            });
        }

        {
            let mut state = inner.state.lock();
            state.status_announced = false;
            if inner.registry.lock().is_empty() {
                state.region = None;
                state.stored_timetoken = None;
                state.timetoken = 0;
            } else {
                if state.timetoken != 0 {
                    state.stored_timetoken = Some(state.timetoken);
                }
                state.timetoken = 0;
            }
        }

        Inner::reconnect(inner);
    }

    /// Unsubscribe from everything currently subscribed.
    pub fn unsubscribe_all(&self) {
        let (channels, groups) = {
            let registry = self.inner.registry.lock();
            (registry.target_channels(false), registry.target_groups(false))
        };
        let mut op = UnsubscribeOperation::channels(channels);
        op.channel_groups = groups;
        self.unsubscribe(op);
    }

    /// Attach presence state to subscribed names and restart the loop.
    pub fn set_presence_state(&self, op: StateOperation) {
        self.inner.registry.lock().apply_state(&op);
        Inner::reconnect(&self.inner);
    }

    /// Register or release heartbeat-only presence.
    pub fn set_presence_connected(&self, op: PresenceOperation) {
        let inner = &self.inner;
        inner.registry.lock().apply_presence(&op);

        if !inner.config.suppress_leave_events && !op.connected {
            let transport = inner.transport.clone();
            let listeners = inner.listeners.clone();
            let channels = op.channels.clone();
            let groups = op.channel_groups.clone();
            tokio::spawn(async move {
                let status = transport.leave(&channels, &groups).await;
                listeners.announce_status(&status);
            });
        }

        inner.register_heartbeat_timer();
    }

    /// Mark the engine connected and (re)start the loop and heartbeat.
    pub fn reconnect(&self) {
        Inner::reconnect(&self.inner);
    }

    /// Stop the loop, all timers, and the outstanding call. Cancellation
    /// is silent; no status is announced.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Tear the engine down. With `force`, the dispatcher is aborted
    /// even if undelivered messages remain queued.
    pub fn destroy(&self, force: bool) {
        let inner = &self.inner;
        inner.disconnect();
        inner.reconnection.stop();
        inner.queue_tx.close();
        if force {
            if let Some(task) = inner.state.lock().dispatcher_task.take() {
                task.abort();
            }
        }
    }

    /// Currently subscribed channel names (no presence mirrors).
    pub fn subscribed_channels(&self) -> Vec<String> {
        self.inner.registry.lock().target_channels(false)
    }

    /// Currently subscribed channel-group names.
    pub fn subscribed_channel_groups(&self) -> Vec<String> {
        self.inner.registry.lock().target_groups(false)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(task) = state.subscribe_task.take() {
            task.abort();
        }
        if let Some(task) = state.dispatcher_task.take() {
            task.abort();
        }
    }
}

impl Inner {
    fn reconnect(inner: &Arc<Inner>) {
        inner.state.lock().connected = true;
        Inner::start_subscribe_loop(inner);
        inner.register_heartbeat_timer();
    }

    fn disconnect(&self) {
        let mut state = self.state.lock();
        state.connected = false;
        state.epoch += 1;
        if let Some(task) = state.subscribe_task.take() {
            task.abort();
        }
        drop(state);

        self.registry.lock().reset_temporary_unavailable();
        self.delayed_reconnection.stop();
        self.heartbeat.stop();
        tracing::debug!("disconnected");
    }

    fn register_heartbeat_timer(&self) {
        self.heartbeat.register(
            Duration::from_secs(self.config.heartbeat_interval),
            self.config.heartbeat_notification,
            self.transport.clone(),
            self.registry.clone(),
            self.listeners.clone(),
        );
    }

    /// Cancel any running loop task and spawn a fresh one.
    fn start_subscribe_loop(inner: &Arc<Inner>) {
        let mut state = inner.state.lock();
        if !state.connected {
            return;
        }
        state.epoch += 1;
        let epoch = state.epoch;
        if let Some(task) = state.subscribe_task.take() {
            task.abort();
        }
        drop(state);

        let weak = Arc::downgrade(inner);
        let task = tokio::spawn(subscribe_loop(weak, epoch));

        let mut state = inner.state.lock();
        if state.epoch == epoch {
            state.subscribe_task = Some(task);
        } else {
            // another restart won the race while we were spawning
            task.abort();
        }
    }

    /// Decide the next step from current loop + registry state.
    fn plan_request(&self, epoch: u64) -> Plan {
        let (timetoken, region) = {
            let state = self.state.lock();
            if !state.connected || state.epoch != epoch {
                return Plan::Stop;
            }
            (state.timetoken, state.region.clone())
        };

        let registry = self.registry.lock();
        if !registry.has_anything_to_subscribe() {
            tracing::debug!("nothing to subscribe, loop going idle");
            return Plan::Stop;
        }
        if registry.subscribed_to_only_temporary_unavailable() {
            return Plan::Sleep;
        }

        Plan::Request(SubscribeRequest {
            channels: registry.effective_channels(),
            channel_groups: registry.effective_channel_groups(),
            timetoken,
            region,
            filter_expression: self.config.filter_expression.clone(),
            state: registry.create_state_payload(),
        })
    }

    /// Give parked names another chance after the sleep.
    fn retry_unavailable(&self, epoch: u64) {
        {
            let state = self.state.lock();
            if !state.connected || state.epoch != epoch {
                return;
            }
        }
        tracing::debug!("retrying temporarily unavailable channels");
        self.registry.lock().reset_temporary_unavailable();
    }

    /// Route one completed long-poll. Returns what the loop does next.
    fn handle_outcome(inner: &Arc<Inner>, epoch: u64, outcome: SubscribeOutcome) -> Directive {
        {
            let state = inner.state.lock();
            if state.epoch != epoch {
                return Directive::Stop;
            }
        }

        let SubscribeOutcome { envelope, status } = outcome;
        if status.error {
            return Self::handle_error(inner, &status);
        }
        Self::handle_success(inner, epoch, envelope, status)
    }

    fn handle_error(inner: &Arc<Inner>, status: &Status) -> Directive {
        match status.category {
            StatusCategory::Timeout => {
                // normal long-poll expiry; reissue without announcing
                tracing::debug!("long-poll timed out, restarting");
                Directive::Continue
            }
            StatusCategory::UnexpectedDisconnect => {
                tracing::warn!("unexpected disconnect, polling for connectivity");
                inner.disconnect();
                inner.listeners.announce_status(status);
                inner.reconnection.start_polling();
                Directive::Stop
            }
            StatusCategory::BadRequest | StatusCategory::UriTooLong => {
                tracing::error!(category = ?status.category, "fatal subscribe error");
                inner.disconnect();
                inner.listeners.announce_status(status);
                Directive::Stop
            }
            StatusCategory::AccessDenied => {
                inner.listeners.announce_status(status);
                let affected = !status.affected_channels.is_empty()
                    || !status.affected_channel_groups.is_empty();
                if !affected {
                    return Directive::Stop;
                }
                {
                    let mut registry = inner.registry.lock();
                    for name in &status.affected_channels {
                        tracing::debug!(channel = %name, "parking refused channel");
                        registry.add_temporary_unavailable_channel(name);
                    }
                    for name in &status.affected_channel_groups {
                        registry.add_temporary_unavailable_group(name);
                    }
                }
                Directive::Continue
            }
            _ => {
                inner.listeners.announce_status(status);
                inner.delayed_reconnection.schedule();
                Directive::Stop
            }
        }
    }

    fn handle_success(
        inner: &Arc<Inner>,
        epoch: u64,
        envelope: Option<SubscribeEnvelope>,
        status: Status,
    ) -> Directive {
        if status.category == StatusCategory::Acknowledgment {
            // names the server answered for are reachable again
            let mut registry = inner.registry.lock();
            for name in &status.affected_channels {
                registry.remove_temporary_unavailable_channel(name);
            }
            for name in &status.affected_channel_groups {
                registry.remove_temporary_unavailable_group(name);
            }
        }

        let announce_connected = {
            let mut state = inner.state.lock();
            if state.epoch != epoch {
                return Directive::Stop;
            }
            if state.status_announced {
                false
            } else {
                state.status_announced = true;
                true
            }
        };
        if announce_connected {
            inner
                .listeners
                .announce_status(&status.to_public(StatusCategory::Connected));
        }

        let Some(envelope) = envelope else {
            tracing::warn!("subscribe acknowledged without an envelope");
            return Directive::Continue;
        };
        let SubscribeEnvelope { cursor, messages } = envelope;

        if let Some(threshold) = inner.config.request_message_count_threshold {
            if messages.len() >= threshold {
                inner.listeners.announce_status(
                    &status.to_public(StatusCategory::RequestMessageCountExceeded),
                );
            }
        }

        for message in messages {
            if inner.queue_tx.try_send(message).is_err() {
                tracing::warn!("message queue closed, dropping messages");
                break;
            }
        }

        let mut state = inner.state.lock();
        if state.epoch != epoch {
            return Directive::Stop;
        }
        if let Some(stored) = state.stored_timetoken.take() {
            state.timetoken = stored;
        } else {
            state.timetoken = cursor.timetoken;
        }
        state.region = cursor.region;
        Directive::Continue
    }
}

/// The loop task: plan, poll, handle, repeat.
async fn subscribe_loop(weak: Weak<Inner>, epoch: u64) {
    loop {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let plan = inner.plan_request(epoch);
        let transport = inner.transport.clone();
        drop(inner);

        match plan {
            Plan::Stop => return,
            Plan::Sleep => {
                tokio::time::sleep(SOFT_RETRY_DELAY).await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                inner.retry_unavailable(epoch);
            }
            Plan::Request(request) => {
                let outcome = transport.subscribe(request).await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                match Inner::handle_outcome(&inner, epoch, outcome) {
                    Directive::Continue => {}
                    Directive::Stop => return,
                }
            }
        }
    }
}
