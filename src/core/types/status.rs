//! Status events announced to listeners and routed by the subscribe loop.

/// Classification of a status event.
///
/// The subscribe loop's routing table dispatches on this; listeners
/// receive it on every announced [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCategory {
    /// A request completed successfully.
    Acknowledgment,
    /// First successful subscribe response after a channel-mix change.
    Connected,
    /// Connectivity was restored after a hard disconnect.
    Reconnected,
    /// Connectivity polling gave up after the configured attempt cap.
    ReconnectionAttemptsExhausted,
    /// The long-poll elapsed without messages. Retried silently.
    Timeout,
    /// The transport lost the connection unexpectedly.
    UnexpectedDisconnect,
    /// The server rejected the request as malformed.
    BadRequest,
    /// The request URI exceeded the server's limit.
    UriTooLong,
    /// The server refused one or more channels or groups.
    AccessDenied,
    /// A single response carried at least the configured message count.
    RequestMessageCountExceeded,
    /// The response body could not be decoded.
    MalformedResponse,
    /// Any failure that does not fit another category.
    Unknown,
}

/// The endpoint a status originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Subscribe,
    Heartbeat,
    Leave,
    Time,
}

/// A status event.
///
/// Produced by the transport for every completed call and by the engine
/// for synthetic lifecycle events (connected, reconnected, exhausted).
/// `error` distinguishes failures from acknowledgments; `category`
/// carries the classification.
#[derive(Debug, Clone)]
pub struct Status {
    pub category: StatusCategory,
    pub error: bool,
    /// HTTP status code of the underlying response, `0` when the request
    /// never reached the server.
    pub status_code: u16,
    pub operation: Option<Operation>,
    pub auth_key: Option<String>,
    pub origin: Option<String>,
    pub tls_enabled: bool,
    /// The request URL that produced this status.
    pub client_request: Option<String>,
    /// Channels the status applies to; empty when it applies to the
    /// whole subscription.
    pub affected_channels: Vec<String>,
    /// Channel groups the status applies to.
    pub affected_channel_groups: Vec<String>,
}

impl Status {
    /// Build a bare status with the given category and error flag.
    pub fn new(category: StatusCategory, error: bool) -> Self {
        Self {
            category,
            error,
            status_code: 0,
            operation: None,
            auth_key: None,
            origin: None,
            tls_enabled: false,
            client_request: None,
            affected_channels: Vec::new(),
            affected_channel_groups: Vec::new(),
        }
    }

    /// Derive the user-facing copy of an internal status.
    ///
    /// Only request identity and affected-name fields are forwarded; the
    /// caller supplies the category, and the result is never an error.
    #[must_use]
    pub fn to_public(&self, category: StatusCategory) -> Status {
        Status {
            category,
            error: false,
            status_code: self.status_code,
            operation: self.operation,
            auth_key: self.auth_key.clone(),
            origin: self.origin.clone(),
            tls_enabled: self.tls_enabled,
            client_request: self.client_request.clone(),
            affected_channels: self.affected_channels.clone(),
            affected_channel_groups: self.affected_channel_groups.clone(),
        }
    }
}
