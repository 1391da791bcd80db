//! Alarm model and the no-change sentinel
//!
//! Each update from a channel carries an alarm triple (record status code,
//! severity, message). On the wire the message string is collapsed to an
//! [`AlarmStatus`] code through an [`AlarmStatusTable`]; an update whose
//! triple is unchanged since the last publish is encoded with the reserved
//! `NoChange` sentinel in both alarm fields so consumers keep their previous
//! alarm state.

use std::collections::HashMap;

/// Reserved wire code meaning "unchanged since last publish"
pub const NO_CHANGE_CODE: u8 = 255;

/// Alarm severity carried in every log frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlarmSeverity {
    NoAlarm = 0,
    Minor = 1,
    Major = 2,
    Invalid = 3,
    /// Sentinel: severity unchanged since the last published frame
    NoChange = NO_CHANGE_CODE,
}

impl AlarmSeverity {
    /// Convert to the wire code
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse from the wire code; unknown codes map to `Invalid`
    pub fn from_u8(code: u8) -> Self {
        match code {
            0 => Self::NoAlarm,
            1 => Self::Minor,
            2 => Self::Major,
            NO_CHANGE_CODE => Self::NoChange,
            _ => Self::Invalid,
        }
    }
}

/// Alarm status carried in every log frame
///
/// The named variants are the EPICS record alarm statuses; `NoChange` is the
/// reserved sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlarmStatus {
    NoAlarm = 0,
    Read = 1,
    Write = 2,
    HiHi = 3,
    High = 4,
    LoLo = 5,
    Low = 6,
    State = 7,
    Cos = 8,
    Comm = 9,
    Timeout = 10,
    HwLimit = 11,
    Calc = 12,
    Scan = 13,
    Link = 14,
    Soft = 15,
    BadSub = 16,
    Udf = 17,
    Disable = 18,
    Simm = 19,
    ReadAccess = 20,
    WriteAccess = 21,
    /// Sentinel: status unchanged since the last published frame
    NoChange = NO_CHANGE_CODE,
}

impl AlarmStatus {
    /// Convert to the wire code
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse from the wire code; unknown codes map to `Udf` (undefined)
    pub fn from_u8(code: u8) -> Self {
        match code {
            0 => Self::NoAlarm,
            1 => Self::Read,
            2 => Self::Write,
            3 => Self::HiHi,
            4 => Self::High,
            5 => Self::LoLo,
            6 => Self::Low,
            7 => Self::State,
            8 => Self::Cos,
            9 => Self::Comm,
            10 => Self::Timeout,
            11 => Self::HwLimit,
            12 => Self::Calc,
            13 => Self::Scan,
            14 => Self::Link,
            15 => Self::Soft,
            16 => Self::BadSub,
            17 => Self::Udf,
            18 => Self::Disable,
            19 => Self::Simm,
            20 => Self::ReadAccess,
            21 => Self::WriteAccess,
            NO_CHANGE_CODE => Self::NoChange,
            _ => Self::Udf,
        }
    }
}

/// The alarm triple delivered with each monitor update
///
/// `status_code` is the raw record-level code from the control system; the
/// `message` string is what actually identifies the alarm kind and is mapped
/// to a wire [`AlarmStatus`] at encode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub status_code: u8,
    pub severity: AlarmSeverity,
    pub message: String,
}

impl Alarm {
    /// An alarm triple signalling "no alarm"
    pub fn none() -> Self {
        Self {
            status_code: 0,
            severity: AlarmSeverity::NoAlarm,
            message: "NO_ALARM".to_string(),
        }
    }
}

/// What the update handler asks the converter to encode for the alarm fields
#[derive(Debug, Clone, Copy)]
pub enum AlarmEncoding<'a> {
    /// The triple differs from the last published one - send it in full
    Changed(&'a Alarm),
    /// Unchanged - send the `NoChange` sentinel in both fields
    NoChange,
}

/// Mapping from record alarm-message strings to wire status codes
///
/// The mapping is schema-convention rather than protocol, so it is a table
/// the caller can extend instead of hard-coded logic. The default table
/// covers the standard EPICS record messages.
#[derive(Debug, Clone)]
pub struct AlarmStatusTable {
    entries: HashMap<&'static str, AlarmStatus>,
}

impl Default for AlarmStatusTable {
    fn default() -> Self {
        let entries = HashMap::from([
            ("NO_ALARM", AlarmStatus::NoAlarm),
            ("READ_ALARM", AlarmStatus::Read),
            ("WRITE_ALARM", AlarmStatus::Write),
            ("HIHI_ALARM", AlarmStatus::HiHi),
            ("HIGH_ALARM", AlarmStatus::High),
            ("LOLO_ALARM", AlarmStatus::LoLo),
            ("LOW_ALARM", AlarmStatus::Low),
            ("STATE_ALARM", AlarmStatus::State),
            ("COS_ALARM", AlarmStatus::Cos),
            ("COMM_ALARM", AlarmStatus::Comm),
            ("TIMEOUT_ALARM", AlarmStatus::Timeout),
            ("HW_LIMIT_ALARM", AlarmStatus::HwLimit),
            ("CALC_ALARM", AlarmStatus::Calc),
            ("SCAN_ALARM", AlarmStatus::Scan),
            ("LINK_ALARM", AlarmStatus::Link),
            ("SOFT_ALARM", AlarmStatus::Soft),
            ("BAD_SUB_ALARM", AlarmStatus::BadSub),
            ("UDF_ALARM", AlarmStatus::Udf),
            ("DISABLE_ALARM", AlarmStatus::Disable),
            ("SIMM_ALARM", AlarmStatus::Simm),
            ("READ_ACCESS_ALARM", AlarmStatus::ReadAccess),
            ("WRITE_ACCESS_ALARM", AlarmStatus::WriteAccess),
        ]);
        Self { entries }
    }
}

impl AlarmStatusTable {
    /// Add or override a message mapping
    pub fn insert(&mut self, message: &'static str, status: AlarmStatus) {
        self.entries.insert(message, status);
    }

    /// Resolve a record alarm message to a wire status
    ///
    /// Unknown messages resolve to `Udf` so a misbehaving record never stops
    /// the stream.
    pub fn resolve(&self, message: &str) -> AlarmStatus {
        match self.entries.get(message) {
            Some(status) => *status,
            None => {
                tracing::debug!(message, "unknown alarm message, mapping to UDF");
                AlarmStatus::Udf
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_round_trip() {
        for sev in [
            AlarmSeverity::NoAlarm,
            AlarmSeverity::Minor,
            AlarmSeverity::Major,
            AlarmSeverity::Invalid,
            AlarmSeverity::NoChange,
        ] {
            assert_eq!(AlarmSeverity::from_u8(sev.as_u8()), sev);
        }
        assert_eq!(AlarmSeverity::from_u8(99), AlarmSeverity::Invalid);
    }

    #[test]
    fn test_status_round_trip() {
        for code in 0..=21u8 {
            let status = AlarmStatus::from_u8(code);
            assert_eq!(status.as_u8(), code);
        }
        assert_eq!(AlarmStatus::from_u8(NO_CHANGE_CODE), AlarmStatus::NoChange);
        assert_eq!(AlarmStatus::from_u8(100), AlarmStatus::Udf);
    }

    #[test]
    fn test_default_table_resolves_record_messages() {
        let table = AlarmStatusTable::default();
        assert_eq!(table.resolve("HIGH_ALARM"), AlarmStatus::High);
        assert_eq!(table.resolve("LOLO_ALARM"), AlarmStatus::LoLo);
        assert_eq!(table.resolve("NO_ALARM"), AlarmStatus::NoAlarm);
    }

    #[test]
    fn test_unknown_message_maps_to_udf() {
        let table = AlarmStatusTable::default();
        assert_eq!(table.resolve("SOMETHING_WEIRD"), AlarmStatus::Udf);
    }

    #[test]
    fn test_table_override() {
        let mut table = AlarmStatusTable::default();
        table.insert("VENDOR_ALARM", AlarmStatus::Soft);
        assert_eq!(table.resolve("VENDOR_ALARM"), AlarmStatus::Soft);
    }
}
