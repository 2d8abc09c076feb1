//! Error types for the realtime crate.

use thiserror::Error;

/// Result type alias for realtime operations.
pub type Result<T> = std::result::Result<T, RealtimeError>;

/// Errors surfaced by the realtime reconciliation layers.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Backing store rejected or failed a query/mutation.
    #[error("backend error: {0}")]
    Backend(String),

    /// Change-feed subscription could not be established or was lost.
    #[error("subscription error: {0}")]
    Subscription(String),

    /// Caller-supplied input that cannot be processed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Payload decoding error at the feed boundary.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RealtimeError {
    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Create a subscription error.
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription(message.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
