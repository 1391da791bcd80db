//! Engine error types

use thiserror::Error;

/// Errors surfaced by the forwarding engine
///
/// Per-stream failures stay per-stream: an error constructing or feeding one
/// handler never propagates to other channels.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Protocol-level failure (unknown schema, unsupported value type, ...)
    #[error(transparent)]
    Protocol(#[from] pvf_protocol::ProtocolError),

    /// Bus-level failure (subscribe failure, transport error, ...)
    #[error(transparent)]
    Bus(#[from] pvf_bus::BusError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, CoreError>;
