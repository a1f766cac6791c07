//! # Configuration
//!
//! The relay reads a TOML file at startup. Everything in it is fixed for the life of
//! the process: throttles, queue capacities and the address table are read once and
//! never change while the relay runs.
//!
//! ## Sections
//!
//! - [`RelayConfig`] - node id, pacing and queue sizes
//! - [`RadioConfig`] - radio modem port and channel
//! - [`SerialConfig`] - operator port (stdin/stdout when unset)
//! - [`LoggingConfig`] - level and optional log file
//! - `address_table` - optional override of the 16 mesh addresses
//!
//! ## Example
//!
//! ```toml
//! [relay]
//! node_id = 0
//! network_throttle_ms = 1000
//! serial_throttle_ms = 50
//! network_queue_capacity = 16
//! data_queue_capacity = 32
//!
//! [radio]
//! port = "/dev/ttyACM0"
//! baud_rate = 115200
//! channel = 90
//!
//! [serial]
//! baud_rate = 115200
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::mesh::{AddressTable, MeshAddress};
use crate::relay::{
    RelaySettings, DEFAULT_DATA_QUEUE, DEFAULT_NETWORK_QUEUE, DEFAULT_NETWORK_THROTTLE_MS,
    DEFAULT_SERIAL_THROTTLE_MS,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub relay: RelayConfig,
    pub radio: RadioConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    pub logging: LoggingConfig,
    /// Mesh addresses for logical ids 0-15. Factory layout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_table: Option<Vec<u16>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Logical id of this relay; its mesh address comes from the address table.
    pub node_id: u16,
    /// Minimum time between two command sends (ms).
    pub network_throttle_ms: u32,
    /// Minimum time between two telemetry lines to the operator (ms).
    pub serial_throttle_ms: u32,
    pub network_queue_capacity: usize,
    pub data_queue_capacity: usize,
    /// Echo parsed fields and describe each command on the operator link before it
    /// is sent.
    #[serde(default = "default_echo")]
    pub echo_commands: bool,
    /// Interval for periodic stats logging at debug level (0 disables).
    #[serde(default = "default_stats_interval")]
    pub stats_interval_ms: u32,
    /// How often the control loop polls the transports (ms).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_echo() -> bool {
    true
}

fn default_stats_interval() -> u32 {
    30_000
}

fn default_poll_interval() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioConfig {
    /// Serial port of the radio modem. Empty means dry run.
    pub port: String,
    pub baud_rate: u32,
    pub channel: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Operator port; stdin/stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl RelayConfig {
    pub fn settings(&self) -> RelaySettings {
        RelaySettings {
            network_throttle_ms: self.network_throttle_ms,
            serial_throttle_ms: self.serial_throttle_ms,
            network_queue_capacity: self.network_queue_capacity,
            data_queue_capacity: self.data_queue_capacity,
            echo_commands: self.echo_commands,
            stats_interval_ms: self.stats_interval_ms,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    /// Load and validate a configuration file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;
        Ok(config)
    }

    /// Load `path`, or fall back to the defaults when no file exists there. A file
    /// that exists but does not load is still an error.
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            log::info!("No config file at {}; using defaults", path);
            Ok(Config::default())
        }
    }

    /// Write the default configuration to `path`.
    pub async fn create_default(path: &str) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.relay;
        if r.network_throttle_ms == 0 || r.serial_throttle_ms == 0 {
            return Err(anyhow!("throttle intervals must be greater than zero"));
        }
        if r.network_queue_capacity == 0 || r.data_queue_capacity == 0 {
            return Err(anyhow!("queue capacities must be greater than zero"));
        }
        if r.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be greater than zero"));
        }
        self.this_node()?;
        Ok(())
    }

    pub fn address_table(&self) -> Result<AddressTable> {
        match &self.address_table {
            Some(raw) => AddressTable::from_entries(raw),
            None => Ok(AddressTable::default()),
        }
    }

    /// Mesh address of this relay.
    pub fn this_node(&self) -> Result<MeshAddress> {
        self.address_table()?
            .resolve(self.relay.node_id)
            .map_err(|_| anyhow!("node_id {} is not in the address table", self.relay.node_id))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            relay: RelayConfig {
                node_id: 0,
                network_throttle_ms: DEFAULT_NETWORK_THROTTLE_MS,
                serial_throttle_ms: DEFAULT_SERIAL_THROTTLE_MS,
                network_queue_capacity: DEFAULT_NETWORK_QUEUE,
                data_queue_capacity: DEFAULT_DATA_QUEUE,
                echo_commands: default_echo(),
                stats_interval_ms: default_stats_interval(),
                poll_interval_ms: default_poll_interval(),
            },
            radio: RadioConfig {
                port: String::new(),
                baud_rate: 115200,
                channel: 90,
            },
            serial: SerialConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
            address_table: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_factory_values() {
        let config = Config::default();
        assert_eq!(config.relay.network_throttle_ms, 1000);
        assert_eq!(config.relay.serial_throttle_ms, 50);
        assert_eq!(config.radio.channel, 90);
        assert!(config.relay.echo_commands);
        assert!(config.relay.settings().echo_commands);
        assert_eq!(config.this_node().unwrap(), MeshAddress::MASTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn minimal_toml_fills_optional_fields() {
        let text = r#"
            [relay]
            node_id = 0
            network_throttle_ms = 500
            serial_throttle_ms = 20
            network_queue_capacity = 4
            data_queue_capacity = 8

            [radio]
            port = ""
            baud_rate = 57600
            channel = 76

            [logging]
            level = "debug"
            file = "relay.log"
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.relay.poll_interval_ms, 5);
        assert!(config.relay.echo_commands);
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Debug);
        let settings = config.relay.settings();
        assert_eq!(settings.network_queue_capacity, 4);
        assert_eq!(settings.network_throttle_ms, 500);
    }

    #[test]
    fn validation_rejects_zero_sizes_and_bad_tables() {
        let mut config = Config::default();
        config.relay.network_queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.relay.serial_throttle_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.relay.node_id = 16;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.address_table = Some(vec![0; 16]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.relay.network_queue_capacity, DEFAULT_NETWORK_QUEUE);
        assert!(back.address_table.is_none());
        assert!(back.serial.port.is_none());
    }

    #[test]
    fn custom_address_table_is_used() {
        let mut config = Config::default();
        let mut table: Vec<u16> = crate::mesh::DEFAULT_ADDRESSES.to_vec();
        table.swap(0, 1);
        config.address_table = Some(table);
        assert_eq!(config.this_node().unwrap(), MeshAddress(0o1));
    }
}
