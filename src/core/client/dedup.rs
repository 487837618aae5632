//! Bounded filter over recently seen message identities.
//!
//! A message's identity is `(channel, publish timetoken, payload digest)`.
//! The filter keeps the most recent `capacity` identities in insertion
//! order; the dispatcher consults it before fanning a message out. It is
//! cleared on every channel-mix change because timetokens restart.

use std::collections::{HashSet, VecDeque};

use sha2::{Digest, Sha256};

use crate::core::types::SubscribeMessage;

type MessageKey = (String, i64, [u8; 32]);

/// FIFO-bounded set of message identities.
#[derive(Debug)]
pub struct DuplicationFilter {
    capacity: usize,
    seen: HashSet<MessageKey>,
    order: VecDeque<MessageKey>,
}

impl DuplicationFilter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    fn key_for(message: &SubscribeMessage) -> MessageKey {
        let payload = serde_json::to_vec(&message.payload).unwrap_or_default();
        let digest: [u8; 32] = Sha256::digest(&payload).into();
        (
            message.channel.clone(),
            message.publish_timetoken(),
            digest,
        )
    }

    /// Check whether the message was seen recently, recording it if not.
    pub fn is_duplicate(&mut self, message: &SubscribeMessage) -> bool {
        if self.capacity == 0 {
            return false;
        }

        let key = Self::key_for(message);
        if self.seen.contains(&key) {
            return true;
        }

        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(key.clone());
        self.order.push_back(key);
        false
    }

    /// Forget everything. Called on channel-mix changes.
    pub fn clear(&mut self) {
        self.seen.clear();
        self.order.clear();
    }
}
