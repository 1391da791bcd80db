//! pvforward configuration
//!
//! TOML-based startup configuration with sensible defaults. Only the broker
//! address is required; everything else has a working default. Streams are
//! *not* configured here - they arrive at runtime on the command topic.
//!
//! # Example Minimal Config
//!
//! ```toml
//! [broker]
//! bootstrap = "localhost:9092"
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [broker]
//! bootstrap = "kafka-1:9092,kafka-2:9092"
//!
//! [command]
//! topic = "forward_commands"
//! group = "pvforward"
//!
//! [status]
//! topic = "forward_status"
//! interval_secs = 4
//!
//! [log]
//! level = "debug"
//! ```

mod error;
mod logging;

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogLevel};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Message broker connection settings
    pub broker: BrokerConfig,

    /// Reconfiguration command topic settings
    pub command: CommandConfig,

    /// Status reporting settings
    pub status: StatusConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.broker.bootstrap.is_empty() {
            return Err(ConfigError::invalid("broker.bootstrap must not be empty"));
        }
        if self.command.topic.is_empty() {
            return Err(ConfigError::invalid("command.topic must not be empty"));
        }
        if self.status.topic.is_empty() {
            return Err(ConfigError::invalid("status.topic must not be empty"));
        }
        if self.status.interval_secs == 0 {
            return Err(ConfigError::invalid("status.interval_secs must be > 0"));
        }
        if self.command.topic == self.status.topic {
            return Err(ConfigError::invalid(
                "command.topic and status.topic must differ",
            ));
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Message broker connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Bootstrap server list, comma separated
    pub bootstrap: String,

    /// Per-publish delivery timeout in milliseconds
    pub delivery_timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bootstrap: "localhost:9092".to_string(),
            delivery_timeout_ms: 5000,
        }
    }
}

impl BrokerConfig {
    /// Delivery timeout as a `Duration`
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}

/// Reconfiguration command topic settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Topic the service consumes add/remove commands from
    pub topic: String,

    /// Consumer group id
    pub group: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            topic: "forward_commands".to_string(),
            group: "pvforward".to_string(),
        }
    }
}

/// Status reporting settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Topic status snapshots are published to
    pub topic: String,

    /// Publish interval in seconds
    pub interval_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            topic: "forward_status".to_string(),
            interval_secs: 4,
        }
    }
}

impl StatusConfig {
    /// Publish interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.broker.bootstrap, "localhost:9092");
        assert_eq!(config.command.topic, "forward_commands");
        assert_eq!(config.status.topic, "forward_status");
        assert_eq!(config.status.interval(), Duration::from_secs(4));
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[broker]
bootstrap = "kafka-1:9092,kafka-2:9092"
delivery_timeout_ms = 2000

[command]
topic = "cmds"
group = "fw1"

[status]
topic = "heartbeat"
interval_secs = 10

[log]
level = "debug"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.broker.bootstrap, "kafka-1:9092,kafka-2:9092");
        assert_eq!(config.broker.delivery_timeout(), Duration::from_millis(2000));
        assert_eq!(config.command.topic, "cmds");
        assert_eq!(config.command.group, "fw1");
        assert_eq!(config.status.interval_secs, 10);
        assert_eq!(config.log.level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(Config::from_str("[broker\nbootstrap = oops").is_err());
    }

    #[test]
    fn test_empty_bootstrap_rejected() {
        let err = Config::from_str("[broker]\nbootstrap = \"\"").unwrap_err();
        assert!(err.to_string().contains("bootstrap"));
    }

    #[test]
    fn test_zero_status_interval_rejected() {
        let err = Config::from_str("[status]\ninterval_secs = 0").unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn test_same_command_and_status_topic_rejected() {
        let toml = "[command]\ntopic = \"t\"\n\n[status]\ntopic = \"t\"";
        assert!(Config::from_str(toml).is_err());
    }
}
