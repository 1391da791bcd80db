//! Status message codec
//!
//! The forwarder periodically publishes a snapshot of its active streams to
//! a status topic as self-describing JSON.

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Result};

/// Reported state of one configured stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub channel: String,
    pub topic: String,
    pub schema: String,
    pub connected: bool,
}

/// Point-in-time view of the service's configuration
///
/// Recomputed on demand by the config manager; never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Milliseconds since the Unix epoch when the snapshot was taken
    pub timestamp_ms: u64,
    /// One entry per configured stream
    pub streams: Vec<StreamStatus>,
}

impl StatusSnapshot {
    /// Number of configured streams
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}

/// Serialize a snapshot to its JSON wire form
pub fn encode_status(snapshot: &StatusSnapshot) -> Vec<u8> {
    // Only strings, bools and integers; serialization cannot fail.
    serde_json::to_vec(snapshot).unwrap_or_default()
}

/// Parse a snapshot from its JSON wire form
pub fn decode_status(payload: &[u8]) -> Result<StatusSnapshot> {
    serde_json::from_slice(payload).map_err(|e| ProtocolError::StatusParse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        let snapshot = StatusSnapshot {
            timestamp_ms: 1_700_000_000_000,
            streams: vec![
                StreamStatus {
                    channel: "SIM:Spd1".to_string(),
                    topic: "motion".to_string(),
                    schema: "f142".to_string(),
                    connected: true,
                },
                StreamStatus {
                    channel: "SIM:Spd2".to_string(),
                    topic: "motion".to_string(),
                    schema: "f142".to_string(),
                    connected: false,
                },
            ],
        };

        let bytes = encode_status(&snapshot);
        let decoded = decode_status(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.stream_count(), 2);
    }

    #[test]
    fn test_malformed_status_rejected() {
        let err = decode_status(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::StatusParse(_)));
    }
}
