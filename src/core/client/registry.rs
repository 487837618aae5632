//! Authoritative record of what the client is subscribed to.
//!
//! The registry owns the channel/group maps, their per-name state blobs,
//! and the *temporarily unavailable* sub-sets (names the server is
//! currently refusing). Derived views (effective request lists, target
//! lists for presence calls) are computed on demand and never stored.
//!
//! All methods take `&mut self` / `&self`; the caller (the manager)
//! serializes access under its registry lock.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use crate::core::types::{
    presence_mirror, PresenceOperation, StateOperation, SubscribeOperation, UnsubscribeOperation,
};

#[derive(Debug, Clone, Default)]
struct SubscriptionItem {
    with_presence: bool,
    state: Option<Value>,
}

/// Channel and channel-group subscription state.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    channels: HashMap<String, SubscriptionItem>,
    groups: HashMap<String, SubscriptionItem>,
    /// Names registered for heartbeats only (presence without subscribe).
    heartbeat_channels: HashSet<String>,
    heartbeat_groups: HashSet<String>,
    unavailable_channels: HashSet<String>,
    unavailable_groups: HashSet<String>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscribe operation.
    pub fn apply_subscribe(&mut self, op: &SubscribeOperation) {
        for name in &op.channels {
            self.channels.insert(
                name.clone(),
                SubscriptionItem {
                    with_presence: op.presence_enabled,
                    state: None,
                },
            );
        }
        for name in &op.channel_groups {
            self.groups.insert(
                name.clone(),
                SubscriptionItem {
                    with_presence: op.presence_enabled,
                    state: None,
                },
            );
        }
    }

    /// Record an unsubscribe operation. Names leave the unavailable sets
    /// with their subscription.
    pub fn apply_unsubscribe(&mut self, op: &UnsubscribeOperation) {
        for name in &op.channels {
            self.channels.remove(name);
            self.unavailable_channels.remove(name);
        }
        for name in &op.channel_groups {
            self.groups.remove(name);
            self.unavailable_groups.remove(name);
        }
    }

    /// Record a presence-only (heartbeat) operation.
    pub fn apply_presence(&mut self, op: &PresenceOperation) {
        if op.connected {
            self.heartbeat_channels.extend(op.channels.iter().cloned());
            self.heartbeat_groups
                .extend(op.channel_groups.iter().cloned());
        } else {
            for name in &op.channels {
                self.heartbeat_channels.remove(name);
            }
            for name in &op.channel_groups {
                self.heartbeat_groups.remove(name);
            }
        }
    }

    /// Attach state blobs to already-subscribed names.
    pub fn apply_state(&mut self, op: &StateOperation) {
        for name in &op.channels {
            if let Some(item) = self.channels.get_mut(name) {
                item.state = op.state.clone();
            }
        }
        for name in &op.channel_groups {
            if let Some(item) = self.groups.get_mut(name) {
                item.state = op.state.clone();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.groups.is_empty()
    }

    pub fn has_anything_to_subscribe(&self) -> bool {
        !self.is_empty()
    }

    /// True iff every subscribed name is currently parked as
    /// temporarily unavailable; the loop should sleep instead of
    /// issuing a request with nothing in it.
    pub fn subscribed_to_only_temporary_unavailable(&self) -> bool {
        self.has_anything_to_subscribe()
            && self
                .channels
                .keys()
                .all(|c| self.unavailable_channels.contains(c))
            && self.groups.keys().all(|g| self.unavailable_groups.contains(g))
    }

    /// Park a channel the server refused. Ignored unless subscribed.
    pub fn add_temporary_unavailable_channel(&mut self, name: &str) {
        if self.channels.contains_key(name) {
            self.unavailable_channels.insert(name.to_string());
        }
    }

    /// Park a channel group the server refused. Ignored unless subscribed.
    pub fn add_temporary_unavailable_group(&mut self, name: &str) {
        if self.groups.contains_key(name) {
            self.unavailable_groups.insert(name.to_string());
        }
    }

    pub fn remove_temporary_unavailable_channel(&mut self, name: &str) {
        self.unavailable_channels.remove(name);
    }

    pub fn remove_temporary_unavailable_group(&mut self, name: &str) {
        self.unavailable_groups.remove(name);
    }

    pub fn reset_temporary_unavailable(&mut self) {
        self.unavailable_channels.clear();
        self.unavailable_groups.clear();
    }

    /// Channels for the next subscribe request: subscribed names plus
    /// presence mirrors, minus the temporarily unavailable set.
    pub fn effective_channels(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.channels.len() * 2);
        for (name, item) in &self.channels {
            if self.unavailable_channels.contains(name) {
                continue;
            }
            names.push(name.clone());
            if item.with_presence {
                names.push(presence_mirror(name));
            }
        }
        names.sort();
        names
    }

    /// Channel groups for the next subscribe request.
    pub fn effective_channel_groups(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.groups.len() * 2);
        for (name, item) in &self.groups {
            if self.unavailable_groups.contains(name) {
                continue;
            }
            names.push(name.clone());
            if item.with_presence {
                names.push(presence_mirror(name));
            }
        }
        names.sort();
        names
    }

    /// Subscribed channel names for presence/leave listings, optionally
    /// with their presence mirrors.
    pub fn target_channels(&self, with_presence: bool) -> Vec<String> {
        let mut names = Vec::with_capacity(self.channels.len() * 2);
        for (name, item) in &self.channels {
            names.push(name.clone());
            if with_presence && item.with_presence {
                names.push(presence_mirror(name));
            }
        }
        names.sort();
        names
    }

    /// Subscribed group names for presence/leave listings.
    pub fn target_groups(&self, with_presence: bool) -> Vec<String> {
        let mut names = Vec::with_capacity(self.groups.len() * 2);
        for (name, item) in &self.groups {
            names.push(name.clone());
            if with_presence && item.with_presence {
                names.push(presence_mirror(name));
            }
        }
        names.sort();
        names
    }

    /// Channels announced on heartbeat calls: subscribed plus
    /// heartbeat-only names.
    pub fn heartbeat_channels(&self) -> Vec<String> {
        let mut names = self.target_channels(false);
        names.extend(self.heartbeat_channels.iter().cloned());
        names.sort();
        names.dedup();
        names
    }

    /// Channel groups announced on heartbeat calls.
    pub fn heartbeat_groups(&self) -> Vec<String> {
        let mut names = self.target_groups(false);
        names.extend(self.heartbeat_groups.iter().cloned());
        names.sort();
        names.dedup();
        names
    }

    /// Per-name state blobs for the subscribe request; empty when no
    /// name carries state.
    pub fn create_state_payload(&self) -> BTreeMap<String, Value> {
        let mut payload = BTreeMap::new();
        for (name, item) in self.channels.iter().chain(self.groups.iter()) {
            if let Some(state) = &item.state {
                payload.insert(name.clone(), state.clone());
            }
        }
        payload
    }
}
