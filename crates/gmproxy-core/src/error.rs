//! Error types for gmproxy

use std::time::Duration;
use thiserror::Error;

/// Result type for gmproxy operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// gmproxy error types
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Proxy constructed without a channel id
    #[error("GMProxy requires a channel id to be instantiated")]
    MissingChannelId,

    /// No response arrived within the configured window
    #[error("Call {method}#{call_id} timed out after {after:?}")]
    Timeout {
        method: String,
        call_id: String,
        after: Duration,
    },

    /// Pending call was torn down before a response arrived
    #[error("Call {method}#{call_id} was cancelled")]
    Cancelled { method: String, call_id: String },

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Transport connection is gone
    #[error("Transport closed")]
    Closed,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Serialization(err.to_string())
    }
}

impl ProxyError {
    /// Whether this error means the peer never answered in time
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProxyError::Timeout { .. })
    }
}
