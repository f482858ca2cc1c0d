//! Connection error types

use thiserror::Error;

/// Errors surfaced by the connection manager's public API
///
/// Transport failures are never returned; they are reported as events.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Base URL could not be turned into a WebSocket URL
    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Socket is not open; the message was dropped
    #[error("Socket is not open")]
    NotConnected,

    /// Outbound message could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConnectionError {
    pub(crate) fn invalid_url(url: &str, reason: impl std::fmt::Display) -> Self {
        ConnectionError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for connection operations
pub type ConnectionResult<T> = Result<T, ConnectionError>;
