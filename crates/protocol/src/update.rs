//! Channel update model

use crate::{Alarm, Value};

/// One update delivered by a channel monitor callback
///
/// Updates are consumed by the owning update handler during the callback and
/// not retained beyond it (the handler caches a copy for periodic re-publish).
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelUpdate {
    /// The new channel value
    pub value: Value,
    /// Source timestamp, nanoseconds since the Unix epoch
    pub timestamp_ns: u64,
    /// Alarm triple accompanying the value
    pub alarm: Alarm,
}

impl ChannelUpdate {
    /// Construct an update with no active alarm
    pub fn new(value: Value, timestamp_ns: u64) -> Self {
        Self {
            value,
            timestamp_ns,
            alarm: Alarm::none(),
        }
    }

    /// Construct an update carrying an alarm triple
    pub fn with_alarm(value: Value, timestamp_ns: u64, alarm: Alarm) -> Self {
        Self {
            value,
            timestamp_ns,
            alarm,
        }
    }
}
