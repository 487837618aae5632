//! Builder operations accepted by the subscription manager facade.
//!
//! Each operation is a plain value describing one registry mutation.
//! They use the same fluent `with_*` style as the rest of the crate.

use serde_json::Value;

/// Subscribe to channels and/or channel groups.
#[derive(Debug, Clone, Default)]
pub struct SubscribeOperation {
    pub channels: Vec<String>,
    pub channel_groups: Vec<String>,
    /// Also subscribe to the presence mirrors of the given names.
    pub presence_enabled: bool,
    /// Explicit cursor to resume from instead of "now".
    pub timetoken: Option<i64>,
}

impl SubscribeOperation {
    pub fn channels<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: names.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_channel_groups<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channel_groups = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_presence(mut self) -> Self {
        self.presence_enabled = true;
        self
    }

    #[must_use]
    pub fn with_timetoken(mut self, timetoken: i64) -> Self {
        self.timetoken = Some(timetoken);
        self
    }
}

/// Unsubscribe from channels and/or channel groups.
#[derive(Debug, Clone, Default)]
pub struct UnsubscribeOperation {
    pub channels: Vec<String>,
    pub channel_groups: Vec<String>,
}

impl UnsubscribeOperation {
    pub fn channels<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: names.into_iter().map(Into::into).collect(),
            channel_groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_channel_groups<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channel_groups = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Announce presence on channels without subscribing to them.
///
/// `connected = true` registers the names for heartbeat calls;
/// `connected = false` removes them and releases server-side presence
/// with a Leave request.
#[derive(Debug, Clone, Default)]
pub struct PresenceOperation {
    pub channels: Vec<String>,
    pub channel_groups: Vec<String>,
    pub connected: bool,
}

impl PresenceOperation {
    pub fn connected<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: names.into_iter().map(Into::into).collect(),
            channel_groups: Vec::new(),
            connected: true,
        }
    }

    pub fn disconnected<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: names.into_iter().map(Into::into).collect(),
            channel_groups: Vec::new(),
            connected: false,
        }
    }

    #[must_use]
    pub fn with_channel_groups<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channel_groups = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Attach an opaque state blob to subscribed channels/groups.
///
/// The blob rides along on subscribe requests and is returned to other
/// subscribers through presence events.
#[derive(Debug, Clone, Default)]
pub struct StateOperation {
    pub channels: Vec<String>,
    pub channel_groups: Vec<String>,
    pub state: Option<Value>,
}

impl StateOperation {
    pub fn channels<I, S>(names: I, state: Value) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: names.into_iter().map(Into::into).collect(),
            channel_groups: Vec::new(),
            state: Some(state),
        }
    }

    #[must_use]
    pub fn with_channel_groups<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channel_groups = names.into_iter().map(Into::into).collect();
        self
    }
}
