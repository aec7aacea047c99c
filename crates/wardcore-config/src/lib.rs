//! Configuration management for wardcore.
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (`WARDCORE_*` prefix, highest precedence)
//! 2. `wardcore.local.toml` (gitignored, local overrides)
//! 3. `wardcore.toml` (git-tracked, project config)
//! 4. `~/.config/wardcore/config.toml` (user defaults)
//! 5. Built-in defaults (lowest precedence)

use serde::{Deserialize, Serialize};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Top-level wardcore configuration, grouped by the subsystem each key
/// governs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WardcoreConfig {
    pub detector: DetectorConfig,
    pub txtable: TxTableConfig,
    pub net: NetConfig,
    pub dispatch: DispatchConfig,
}

/// Failure-detector probing and timeout cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DetectorConfig {
    pub probe_interval_micros: u64,
    pub timeout_micros: u64,
    pub failure_detector_port_offset: u16,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            probe_interval_micros: 50_000,
            timeout_micros: 250_000,
            failure_detector_port_offset: 2111,
        }
    }
}

/// Prepared-op watchdog timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TxTableConfig {
    pub tx_timeout_micros: u64,
}

impl Default for TxTableConfig {
    fn default() -> Self {
        Self {
            tx_timeout_micros: 500,
        }
    }
}

/// Transport and datagram sizing shared by the detector and its peers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetConfig {
    pub locator_preference: Vec<String>,
    pub max_datagram_bytes: usize,
    pub bind_address: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            locator_preference: vec!["infrc".to_string(), "fast+udp".to_string(), "tcp".to_string()],
            max_datagram_bytes: 1500,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

/// The worker-to-dispatch command channel (see the concurrency model's
/// `DispatchHandle` hop).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    pub dispatch_queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dispatch_queue_capacity: 1024,
        }
    }
}

impl WardcoreConfig {
    /// Loads configuration from the default hierarchy rooted at the current
    /// directory.
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Loads configuration from a specific project directory.
    pub fn load_from_dir(project_dir: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    #[must_use]
    pub fn locator_preference_refs(&self) -> Vec<&str> {
        self.net.locator_preference.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = WardcoreConfig::default();
        assert_eq!(config.detector.probe_interval_micros, 50_000);
        assert_eq!(config.detector.timeout_micros, 250_000);
        assert_eq!(config.detector.failure_detector_port_offset, 2111);
        assert_eq!(config.txtable.tx_timeout_micros, 500);
        assert_eq!(config.net.locator_preference, vec!["infrc", "fast+udp", "tcp"]);
        assert_eq!(config.net.max_datagram_bytes, 1500);
        assert_eq!(config.net.bind_address, "127.0.0.1");
        assert_eq!(config.dispatch.dispatch_queue_capacity, 1024);
    }

    #[test]
    fn locator_preference_refs_borrows_strings() {
        let config = WardcoreConfig::default();
        assert_eq!(config.locator_preference_refs(), vec!["infrc", "fast+udp", "tcp"]);
    }
}
