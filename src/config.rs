//! Daemon configuration loading from TOML.
//!
//! # Configuration File Format
//!
//! ```toml
//! [link]
//! type = "serial"
//! port = "/dev/ttyUSB0"
//! baud_rate = 57600
//!
//! # Or a network-attached device:
//! # type = "tcp"
//! # address = "192.168.4.1:11411"
//!
//! [daemon]
//! status_interval_ms = 5000
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

fn default_baud_rate() -> u32 {
    57_600
}

fn default_status_interval_ms() -> u64 {
    5_000
}

/// Which byte link the daemon opens toward the device.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Link kind.
    ///
    /// **Valid values**: "serial", "tcp"
    /// **Required**: Yes
    #[serde(rename = "type")]
    pub link_type: String,

    /// Serial device path (e.g., "/dev/ttyUSB0", "COM3").
    ///
    /// **Required**: For "serial" links
    #[serde(default)]
    pub port: Option<String>,

    /// Serial baud rate.
    ///
    /// **Default**: 57600
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Device endpoint as "host:port".
    ///
    /// **Required**: For "tcp" links
    #[serde(default)]
    pub address: Option<String>,
}

/// Daemon behavior knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// How often the daemon logs link statistics.
    ///
    /// **Units**: Milliseconds
    /// **Default**: 5000
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub link: LinkConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Validation
    ///
    /// - "serial" links require `port`
    /// - "tcp" links require `address`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = basic_toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        match config.link.link_type.as_str() {
            "serial" => {
                if config.link.port.is_none() {
                    return Err(Error::Config(
                        "serial link requires port in [link] section".to_string(),
                    ));
                }
            }
            "tcp" => {
                if config.link.address.is_none() {
                    return Err(Error::Config(
                        "tcp link requires address in [link] section".to_string(),
                    ));
                }
            }
            other => {
                return Err(Error::Config(format!("Unknown link type: {}", other)));
            }
        }

        Ok(config)
    }
}
