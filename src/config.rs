//! # Configuration Management
//!
//! Centralized configuration for the courier library and CLI.
//!
//! This module provides structured configuration for the sending side
//! (packet budget, signing), the receiving side (drop directories), key file
//! locations and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()` (`AIRGAP_COURIER_*`)
//!
//! ## Security Considerations
//! - Unsigned operation must be switched on explicitly and is flagged by
//!   `validate()`
//! - The packet budget must leave room for the fingerprint and signature that
//!   every packet repeats

use crate::core::packet::{Packet, Signature};
use crate::error::{CourierError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Default maximum serialized size of one packet, in bytes
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1000;

/// Length of a hex SHA-256 fingerprint
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Length of a hex Ed25519 signature
pub const SIGNATURE_HEX_LEN: usize = 128;

/// Default extension of packet files in a drop directory
pub const DEFAULT_PACKET_EXTENSION: &str = "txt";

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CourierConfig {
    /// Sending side configuration
    #[serde(default)]
    pub sender: SenderConfig,

    /// Receiving side configuration
    #[serde(default)]
    pub receiver: ReceiverConfig,

    /// Key file locations
    #[serde(default)]
    pub keys: KeyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CourierConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| CourierError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| CourierError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| CourierError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(size) = std::env::var("AIRGAP_COURIER_MAX_PACKET_SIZE") {
            config.sender.max_packet_size = size.parse::<usize>().map_err(|e| {
                CourierError::ConfigError(format!("Invalid AIRGAP_COURIER_MAX_PACKET_SIZE: {e}"))
            })?;
        }

        if let Ok(dir) = std::env::var("AIRGAP_COURIER_OUTBOX_DIR") {
            config.sender.outbox_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("AIRGAP_COURIER_INBOX_DIR") {
            config.receiver.inbox_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("AIRGAP_COURIER_OUTPUT_DIR") {
            config.receiver.output_dir = PathBuf::from(dir);
        }

        if let Ok(flag) = std::env::var("AIRGAP_COURIER_ALLOW_UNSIGNED") {
            let allow = matches!(flag.as_str(), "1" | "true" | "yes");
            config.sender.allow_unsigned = allow;
            config.receiver.allow_unsigned = allow;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CourierError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| CourierError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.sender.validate());
        errors.extend(self.receiver.validate());
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CourierError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Sending side configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SenderConfig {
    /// Maximum serialized size of one packet in bytes
    pub max_packet_size: usize,

    /// Directory packet files are written to
    pub outbox_dir: PathBuf,

    /// Send without a signature
    pub allow_unsigned: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            outbox_dir: PathBuf::from("temp/sender"),
            allow_unsigned: false,
        }
    }
}

impl SenderConfig {
    /// Validate sender configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let signed_overhead = Packet::record_overhead(&Signature::Signed(String::new()))
            .unwrap_or(0)
            + FINGERPRINT_HEX_LEN
            + SIGNATURE_HEX_LEN;

        if self.max_packet_size <= signed_overhead {
            errors.push(format!(
                "Max packet size too small: {} (a signed packet needs more than {signed_overhead} bytes)",
                self.max_packet_size
            ));
        } else if self.max_packet_size > 64 * 1024 {
            errors.push(format!(
                "Max packet size too large: {} (maximum: 65536)",
                self.max_packet_size
            ));
        }

        if self.outbox_dir.as_os_str().is_empty() {
            errors.push("Sender outbox directory cannot be empty".to_string());
        }

        if self.allow_unsigned {
            errors.push(
                "WARNING: Unsigned sending is enabled - not recommended for production"
                    .to_string(),
            );
        }

        errors
    }
}

/// Receiving side configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReceiverConfig {
    /// Directory scanned for packet files
    pub inbox_dir: PathBuf,

    /// Directory reassembled messages are written to
    pub output_dir: PathBuf,

    /// Only files with this extension are read
    pub file_extension: String,

    /// Accept unsigned messages instead of requiring a valid signature
    pub allow_unsigned: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            inbox_dir: PathBuf::from("temp/sender"),
            output_dir: PathBuf::from("temp/receiver"),
            file_extension: String::from(DEFAULT_PACKET_EXTENSION),
            allow_unsigned: false,
        }
    }
}

impl ReceiverConfig {
    /// Validate receiver configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.inbox_dir.as_os_str().is_empty() {
            errors.push("Receiver inbox directory cannot be empty".to_string());
        }

        if self.output_dir.as_os_str().is_empty() {
            errors.push("Receiver output directory cannot be empty".to_string());
        } else if self.output_dir == self.inbox_dir {
            errors.push("Receiver output directory must differ from the inbox".to_string());
        }

        if self.file_extension.is_empty() {
            errors.push("Packet file extension cannot be empty".to_string());
        } else if self.file_extension.starts_with('.') {
            errors.push(format!(
                "Packet file extension should not include a leading dot: '{}'",
                self.file_extension
            ));
        }

        if self.allow_unsigned {
            errors.push(
                "WARNING: Unsigned messages are accepted - authenticity is not checked"
                    .to_string(),
            );
        }

        errors
    }
}

/// Key file locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyConfig {
    /// Hex seed of the sender's Ed25519 signing key
    pub private_key_path: PathBuf,

    /// Hex Ed25519 public key used by the receiver
    pub public_key_path: PathBuf,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            private_key_path: PathBuf::from("config/private_key"),
            public_key_path: PathBuf::from("config/public_key"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("airgap-courier"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
