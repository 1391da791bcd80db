//! pvforward wire protocol
//!
//! Everything that crosses a process boundary lives here:
//!
//! - The channel-update data model (`Value`, `Alarm`, `ChannelUpdate`)
//! - The pluggable converter capability and the `f142` log-frame
//!   encoder/parser (hand-written vtable format, no codegen)
//! - The JSON reconfiguration-command codec and the status-message codec
//!
//! # Data Flow
//!
//! ```text
//! [command topic] ──parse_command──→ ConfigCommand ──→ config manager
//! ChannelUpdate ──Converter::encode──→ log frame bytes ──→ [stream topic]
//! StatusSnapshot ──encode_status──→ JSON ──→ [status topic]
//! ```

mod alarm;
mod command;
mod convert;
mod error;
mod f142;
mod status;
mod update;
mod value;

pub use alarm::{
    Alarm, AlarmEncoding, AlarmSeverity, AlarmStatus, AlarmStatusTable, NO_CHANGE_CODE,
};
pub use command::{parse_command, serialize_command, ConfigCommand, StreamSpec};
pub use convert::{converter_for, known_schemas, Converter, F142Converter};
pub use error::{ProtocolError, Result};
pub use f142::{LogFrame, LogFrameBuilder, FRAME_IDENT, MIN_FRAME_SIZE};
pub use status::{decode_status, encode_status, StatusSnapshot, StreamStatus};
pub use update::ChannelUpdate;
pub use value::{Value, ValueType};

/// Maximum accepted frame size (16 MB) - anything larger is rejected as corrupt
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

#[cfg(test)]
mod command_test;
