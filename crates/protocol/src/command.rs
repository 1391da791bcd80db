//! Reconfiguration command codec
//!
//! Streams are added and removed at runtime through JSON messages on a
//! well-known command topic:
//!
//! ```json
//! { "cmd": "add",
//!   "streams": [
//!     { "channel": "SIM:Spd1",
//!       "channel_provider_type": "pva",
//!       "converter": { "schema": "f142", "topic": "motion", "periodic_update_ms": 500 } }
//!   ] }
//! ```
//!
//! A malformed message is rejected wholesale so a configuration apply is
//! never partial; the prior configuration stays in force.

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Result};

/// One configured stream: channel in, schema + topic out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSpec {
    /// Channel name - the unique key of the stream
    pub channel: String,
    /// Which control-system provider serves the channel (e.g. "pva", "ca")
    #[serde(rename = "channel_provider_type", default = "default_provider")]
    pub provider_type: String,
    /// Schema name for the wire encoding
    pub schema: String,
    /// Output topic for encoded updates
    pub topic: String,
    /// Optional periodic re-publish interval in milliseconds
    #[serde(rename = "periodic_update_ms", skip_serializing_if = "Option::is_none")]
    pub periodic_ms: Option<u64>,
}

fn default_provider() -> String {
    "pva".to_string()
}

/// A parsed reconfiguration command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Upsert the listed streams (idempotent; a changed definition replaces)
    Add(Vec<StreamSpec>),
    /// Drop the named channels (unknown names are no-ops)
    Remove(Vec<String>),
    /// Clear the whole configuration
    RemoveAll,
}

/// Wire form of a command message
#[derive(Debug, Serialize, Deserialize)]
struct CommandMessage {
    cmd: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    streams: Vec<WireStream>,
}

/// Wire form of one stream entry (converter block nested, as published)
#[derive(Debug, Serialize, Deserialize)]
struct WireStream {
    channel: String,
    #[serde(default = "default_provider")]
    channel_provider_type: String,
    #[serde(default)]
    converter: Option<WireConverter>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireConverter {
    schema: String,
    topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    periodic_update_ms: Option<u64>,
}

/// Parse a command message from its JSON wire form
///
/// # Errors
///
/// `ConfigParse` for malformed JSON, an unknown `cmd` verb, or a stream
/// entry missing its converter block. The whole message is rejected; no
/// partial apply happens downstream.
pub fn parse_command(payload: &[u8]) -> Result<ConfigCommand> {
    let message: CommandMessage = serde_json::from_slice(payload)
        .map_err(|e| ProtocolError::ConfigParse(e.to_string()))?;

    match message.cmd.as_str() {
        "add" => {
            let mut specs = Vec::with_capacity(message.streams.len());
            for stream in message.streams {
                let converter = stream.converter.ok_or_else(|| {
                    ProtocolError::ConfigParse(format!(
                        "stream {:?} has no converter block",
                        stream.channel
                    ))
                })?;
                specs.push(StreamSpec {
                    channel: stream.channel,
                    provider_type: stream.channel_provider_type,
                    schema: converter.schema,
                    topic: converter.topic,
                    periodic_ms: converter.periodic_update_ms,
                });
            }
            if specs.is_empty() {
                return Err(ProtocolError::ConfigParse(
                    "add command with no streams".to_string(),
                ));
            }
            Ok(ConfigCommand::Add(specs))
        }
        "remove" => {
            if message.streams.is_empty() {
                return Err(ProtocolError::ConfigParse(
                    "remove command with no streams".to_string(),
                ));
            }
            Ok(ConfigCommand::Remove(
                message.streams.into_iter().map(|s| s.channel).collect(),
            ))
        }
        "remove_all" => Ok(ConfigCommand::RemoveAll),
        other => Err(ProtocolError::ConfigParse(format!(
            "unknown command verb: {other:?}"
        ))),
    }
}

/// Serialize a command to its JSON wire form
///
/// The inverse of [`parse_command`]; used by tooling that publishes
/// configuration and by tests to keep the codec honest.
pub fn serialize_command(command: &ConfigCommand) -> Vec<u8> {
    let message = match command {
        ConfigCommand::Add(specs) => CommandMessage {
            cmd: "add".to_string(),
            streams: specs
                .iter()
                .map(|spec| WireStream {
                    channel: spec.channel.clone(),
                    channel_provider_type: spec.provider_type.clone(),
                    converter: Some(WireConverter {
                        schema: spec.schema.clone(),
                        topic: spec.topic.clone(),
                        periodic_update_ms: spec.periodic_ms,
                    }),
                })
                .collect(),
        },
        ConfigCommand::Remove(channels) => CommandMessage {
            cmd: "remove".to_string(),
            streams: channels
                .iter()
                .map(|channel| WireStream {
                    channel: channel.clone(),
                    channel_provider_type: default_provider(),
                    converter: None,
                })
                .collect(),
        },
        ConfigCommand::RemoveAll => CommandMessage {
            cmd: "remove_all".to_string(),
            streams: Vec::new(),
        },
    };

    // CommandMessage contains only maps, vectors and strings; serialization
    // cannot fail.
    serde_json::to_vec(&message).unwrap_or_default()
}
