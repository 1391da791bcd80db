//! Protocol error types
//!
//! Errors that can occur while parsing commands, encoding updates, or
//! reading log frames.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Reconfiguration command could not be parsed
    ///
    /// The offending message is dropped; prior configuration is unchanged.
    #[error("malformed configuration command: {0}")]
    ConfigParse(String),

    /// No converter is registered under the requested schema name
    #[error("unrecognised schema: {0:?}")]
    UnsupportedSchema(String),

    /// The value's type has no mapping for the selected schema
    #[error("schema {schema} cannot encode value type {value_type:?}")]
    UnsupportedValueType {
        schema: &'static str,
        value_type: crate::ValueType,
    },

    /// Frame is too short to contain required fields
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    /// Frame structure is invalid (bad offsets, truncated vectors, ...)
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Required field missing from a frame
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Unknown value-type code in a frame
    #[error("invalid value type code: {0}")]
    InvalidValueType(u8),

    /// Status message could not be decoded
    #[error("malformed status message: {0}")]
    StatusParse(String),
}

impl ProtocolError {
    /// Create a frame too short error
    #[inline]
    pub fn too_short(expected: usize, actual: usize) -> Self {
        Self::FrameTooShort { expected, actual }
    }

    /// Create an invalid frame error
    #[inline]
    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame(msg.into())
    }

    /// Check if this error only affects a single update
    ///
    /// Recoverable errors drop the offending update; the stream stays live.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnsupportedValueType { .. })
    }
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_per_update_errors_are_recoverable() {
        let recoverable = ProtocolError::UnsupportedValueType {
            schema: "f142",
            value_type: crate::ValueType::Float64,
        };
        assert!(recoverable.is_recoverable());

        assert!(!ProtocolError::UnsupportedSchema("x".to_string()).is_recoverable());
        assert!(!ProtocolError::too_short(48, 8).is_recoverable());
        assert!(!ProtocolError::invalid_frame("bad root").is_recoverable());
    }
}
