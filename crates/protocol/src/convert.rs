//! Converter capability
//!
//! A converter turns one channel update into the wire payload for a named
//! schema. Converters are selected by schema name when a stream is
//! configured; an unknown name is a configuration error raised before any
//! subscription is attempted.

use bytes::Bytes;

use crate::{
    AlarmEncoding, AlarmSeverity, AlarmStatus, AlarmStatusTable, ChannelUpdate, LogFrameBuilder,
    ProtocolError, Result,
};

/// Schema-specific encoder for channel updates
pub trait Converter: Send + Sync {
    /// The schema name this converter serves
    fn schema(&self) -> &'static str;

    /// Encode one update into a wire payload
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedValueType` if the value's type has no mapping for
    /// this schema; the caller drops that single update and keeps the stream
    /// alive.
    fn encode(
        &self,
        source_name: &str,
        update: &ChannelUpdate,
        alarm: AlarmEncoding<'_>,
    ) -> Result<Bytes>;
}

/// Schema names with a registered converter
pub fn known_schemas() -> &'static [&'static str] {
    &["f142"]
}

/// Look up a converter by schema name
///
/// # Errors
///
/// Returns `UnsupportedSchema` for names without a registered converter.
pub fn converter_for(schema: &str) -> Result<Box<dyn Converter>> {
    match schema {
        "f142" => Ok(Box::new(F142Converter::default())),
        other => Err(ProtocolError::UnsupportedSchema(other.to_string())),
    }
}

/// Converter producing f142 log frames
///
/// Carries the alarm-message mapping table; callers needing site-specific
/// alarm messages construct it with an extended table.
pub struct F142Converter {
    alarm_table: AlarmStatusTable,
}

impl Default for F142Converter {
    fn default() -> Self {
        Self {
            alarm_table: AlarmStatusTable::default(),
        }
    }
}

impl F142Converter {
    /// Construct with a custom alarm-message mapping table
    pub fn with_alarm_table(alarm_table: AlarmStatusTable) -> Self {
        Self { alarm_table }
    }
}

impl Converter for F142Converter {
    fn schema(&self) -> &'static str {
        "f142"
    }

    fn encode(
        &self,
        source_name: &str,
        update: &ChannelUpdate,
        alarm: AlarmEncoding<'_>,
    ) -> Result<Bytes> {
        let (status, severity) = match alarm {
            AlarmEncoding::Changed(triple) => {
                (self.alarm_table.resolve(&triple.message), triple.severity)
            }
            AlarmEncoding::NoChange => (AlarmStatus::NoChange, AlarmSeverity::NoChange),
        };

        Ok(LogFrameBuilder::new(source_name)
            .value(&update.value)
            .timestamp_ns(update.timestamp_ns)
            .alarm(status, severity)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Alarm, LogFrame, Value};

    #[test]
    fn test_unknown_schema_is_an_error() {
        let err = converter_for("DOESNTEXIST")
            .err()
            .expect("unknown schema accepted");
        assert!(matches!(err, ProtocolError::UnsupportedSchema(_)));
        assert!(err.to_string().contains("DOESNTEXIST"));
    }

    #[test]
    fn test_f142_lookup() {
        let converter = converter_for("f142").unwrap();
        assert_eq!(converter.schema(), "f142");
        assert!(known_schemas().contains(&"f142"));
    }

    #[test]
    fn test_encode_maps_alarm_message_through_table() {
        let converter = converter_for("f142").unwrap();
        let alarm = Alarm {
            status_code: 4,
            severity: AlarmSeverity::Minor,
            message: "HIGH_ALARM".to_string(),
        };
        let update = ChannelUpdate::with_alarm(Value::Int32(42), 1_100_000_000, alarm.clone());

        let payload = converter
            .encode("source_name", &update, AlarmEncoding::Changed(&alarm))
            .unwrap();
        let frame = LogFrame::parse(&payload).unwrap();
        assert_eq!(frame.alarm_status().unwrap(), AlarmStatus::High);
        assert_eq!(frame.alarm_severity().unwrap(), AlarmSeverity::Minor);
    }

    #[test]
    fn test_encode_no_change_sentinel() {
        let converter = converter_for("f142").unwrap();
        let update = ChannelUpdate::new(Value::Int32(42), 1_100_000_000);

        let payload = converter
            .encode("source_name", &update, AlarmEncoding::NoChange)
            .unwrap();
        let frame = LogFrame::parse(&payload).unwrap();
        assert_eq!(frame.alarm_status().unwrap(), AlarmStatus::NoChange);
        assert_eq!(frame.alarm_severity().unwrap(), AlarmSeverity::NoChange);
    }
}
