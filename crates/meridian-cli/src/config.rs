//! Configuration file loading for the Meridian CLI.
//!
//! The relay core takes plain value objects; everything about files and
//! formats lives here. The file is TOML with three optional tables:
//!
//! ```toml
//! [relay]
//! port = 2020
//! north_port = 9696
//! south_port = 6969
//! socket_buf_size = 1500
//!
//! [condition]
//! latency_ms_max = 50
//! loss_per_1k_max = 10
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::Context;
use meridian_relay::{ConditionConfig, RelayConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Meridian configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Relay ports and socket buffer size
    #[serde(default)]
    pub relay: RelaySection,
    /// Link impairment ranges
    #[serde(default)]
    pub condition: ConditionSection,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[relay]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySection {
    /// Port the rendezvous socket binds to
    #[serde(default = "default_relay_port")]
    pub port: u16,
    /// Source port identifying the north peer
    #[serde(default = "default_north_port")]
    pub north_port: u16,
    /// Source port identifying the south peer
    #[serde(default = "default_south_port")]
    pub south_port: u16,
    /// OS socket buffer size in bytes (0 = OS default)
    #[serde(default)]
    pub socket_buf_size: u32,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            port: default_relay_port(),
            north_port: default_north_port(),
            south_port: default_south_port(),
            socket_buf_size: 0,
        }
    }
}

/// `[condition]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSection {
    /// Added latency lower bound, milliseconds
    #[serde(default)]
    pub latency_ms_min: u64,
    /// Added latency upper bound, milliseconds
    #[serde(default)]
    pub latency_ms_max: u64,
    /// Loss per 1000 datagrams, lower bound
    #[serde(default)]
    pub loss_per_1k_min: u32,
    /// Loss per 1000 datagrams, upper bound
    #[serde(default)]
    pub loss_per_1k_max: u32,
    /// Bandwidth budget lower bound, bytes per second (0 = unlimited)
    #[serde(default)]
    pub bandwidth_min: u64,
    /// Bandwidth budget upper bound, bytes per second (0 = unlimited)
    #[serde(default)]
    pub bandwidth_max: u64,
    /// Candidate MTUs
    #[serde(default = "default_mtus")]
    pub mtus: Vec<usize>,
    /// Seconds between refreshing the impairment draws
    #[serde(default = "default_update_rate")]
    pub update_rate_secs: u64,
}

impl Default for ConditionSection {
    fn default() -> Self {
        Self {
            latency_ms_min: 0,
            latency_ms_max: 0,
            loss_per_1k_min: 0,
            loss_per_1k_max: 0,
            bandwidth_min: 0,
            bandwidth_max: 0,
            mtus: default_mtus(),
            update_rate_secs: default_update_rate(),
        }
    }
}

/// `[logging]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level filter when `-v` is not given
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values

fn default_relay_port() -> u16 {
    2020
}

fn default_north_port() -> u16 {
    9696
}

fn default_south_port() -> u16 {
    6969
}

fn default_mtus() -> Vec<usize> {
    vec![meridian_relay::condition::MAX_UDP_PAYLOAD]
}

fn default_update_rate() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("cannot parse config file {}", path.display()))
    }

    /// Load from `path` when given and present, defaults otherwise.
    ///
    /// An explicitly named file that does not exist is an error; silently
    /// defaulting there would hide a typoed path.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// The relay core's configuration value.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            relay_port: self.relay.port,
            north_port: self.relay.north_port,
            south_port: self.relay.south_port,
            socket_buf_size: self.relay.socket_buf_size,
        }
    }

    /// The condition simulator's configuration value.
    pub fn condition_config(&self) -> ConditionConfig {
        ConditionConfig {
            latency_ms_min: self.condition.latency_ms_min,
            latency_ms_max: self.condition.latency_ms_max,
            loss_per_1k_min: self.condition.loss_per_1k_min,
            loss_per_1k_max: self.condition.loss_per_1k_max,
            bandwidth_min: self.condition.bandwidth_min,
            bandwidth_max: self.condition.bandwidth_max,
            mtus: self.condition.mtus.clone(),
            update_rate_secs: self.condition.update_rate_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_without_file() {
        let config = Config::load_or_default(None).unwrap();
        assert_eq!(config.relay.port, 2020);
        assert_eq!(config.relay.north_port, 9696);
        assert_eq!(config.relay.south_port, 6969);
        assert_eq!(config.logging.level, "info");
        config.relay_config().validate().unwrap();
        config.condition_config().validate().unwrap();
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "[relay]\nport = 4000\n\n[condition]\nlatency_ms_max = 25\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.relay.port, 4000);
        assert_eq!(config.relay.north_port, 9696);
        assert_eq!(config.condition.latency_ms_max, 25);
        assert_eq!(config.condition.update_rate_secs, 1);
    }

    #[test]
    fn missing_named_file_is_an_error() {
        let result = Config::load_or_default(Some(Path::new("/nonexistent/meridian.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn garbage_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "relay = \"not a table\"").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let reloaded: Config = toml::from_str(&text).unwrap();
        assert_eq!(reloaded.relay.port, config.relay.port);
        assert_eq!(reloaded.condition.mtus, config.condition.mtus);
    }
}
