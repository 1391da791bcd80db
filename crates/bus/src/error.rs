//! Bus error types

use thiserror::Error;

/// Errors from producer and monitor capabilities
#[derive(Debug, Error)]
pub enum BusError {
    /// Transport-level failure (broker unreachable, delivery timeout, ...)
    ///
    /// Logged and retried by the caller's own cadence; never fatal to other
    /// streams.
    #[error("transport error: {0}")]
    Transport(String),

    /// Subscription to a channel could not be established
    #[error("failed to subscribe to {channel}: {reason}")]
    SubscribeFailed { channel: String, reason: String },

    /// No monitor backend is registered for the requested provider type
    #[error("unknown channel provider type: {0:?}")]
    UnknownProvider(String),
}

impl BusError {
    /// Create a subscribe failure
    #[inline]
    pub fn subscribe_failed(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SubscribeFailed {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for bus operations
pub type Result<T> = std::result::Result<T, BusError>;
