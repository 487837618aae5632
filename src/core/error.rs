//! Error types for publish/subscribe client operations.
//!
//! The [`Result`] type alias is the shorthand used throughout the crate.
//! Transport-level failures that the subscribe loop routes on are carried
//! as [`Status`](crate::core::types::Status) values rather than errors;
//! `PubSubError` covers the failures that happen outside the loop's
//! category dispatch: endpoint construction, wire decoding, probe
//! requests, and teardown.

use std::io;
use thiserror::Error;

/// Result type for publish/subscribe operations.
pub type Result<T> = std::result::Result<T, PubSubError>;

/// Errors that can occur during publish/subscribe client operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PubSubError {
    /// HTTP request failed with the given error message.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Network I/O error (connection failed, read/write error, etc.).
    ///
    /// These errors are typically retryable.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization or deserialization error.
    ///
    /// Indicates a malformed subscribe envelope or state payload.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint URL could not be constructed.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid client configuration (missing subscribe key, bad origin).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// Request was cancelled before completing.
    #[error("Request aborted")]
    Aborted,

    /// The message queue was closed while the engine was still running.
    #[error("Dispatcher queue closed")]
    QueueClosed,

    /// Internal error in the library.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PubSubError {
    /// Check if this error is retryable.
    ///
    /// Returns `true` for transient errors that may succeed on retry
    /// (timeouts, I/O failures), `false` for permanent ones
    /// (configuration, protocol decoding).
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, PubSubError::Timeout | PubSubError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_retryable() {
        assert!(PubSubError::Timeout.is_retryable());
    }

    #[test]
    fn test_config_not_retryable() {
        assert!(!PubSubError::Config("missing subscribe key".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = PubSubError::Config("missing origin".into());
        assert!(err.to_string().contains("missing origin"));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: PubSubError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert!(err.is_retryable());
    }
}
