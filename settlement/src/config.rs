//! Configuration for the settlement engine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settlement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Market store data directory
    pub market_data_dir: PathBuf,

    /// Bounded retries when the atomic apply reports a balance conflict.
    /// Exhausting them surfaces `Unavailable`.
    pub max_conflict_retries: u32,

    /// Deadline applied to `submit` requests (milliseconds)
    pub default_deadline_ms: u64,

    /// Metrics listen address
    pub metrics_listen_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "settlement-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            market_data_dir: PathBuf::from("./data/market"),
            max_conflict_retries: 3,
            default_deadline_ms: 5_000,
            metrics_listen_addr: "0.0.0.0:9091".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(dir) = std::env::var("SETTLEMENT_MARKET_DIR") {
            config.market_data_dir = PathBuf::from(dir);
        }

        if let Ok(addr) = std::env::var("SETTLEMENT_METRICS_ADDR") {
            config.metrics_listen_addr = addr;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "settlement-engine");
        assert_eq!(config.max_conflict_retries, 3);
        assert_eq!(config.default_deadline_ms, 5_000);
    }
}
