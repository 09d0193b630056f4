//! Configuration management.

use crate::error::{BerthError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default start of the HTTP port allocation range (inclusive).
pub const DEFAULT_PORT_RANGE_START: u16 = 5000;

/// Default end of the HTTP port allocation range (inclusive).
pub const DEFAULT_PORT_RANGE_END: u16 = 5999;

/// Persistent configuration for berth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port_range_start: u16,
    pub port_range_end: u16,
    pub log_level: String,
    pub data_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port_range_start: DEFAULT_PORT_RANGE_START,
            port_range_end: DEFAULT_PORT_RANGE_END,
            log_level: "info".to_string(),
            data_dir: paths::data_dir().to_string_lossy().to_string(),
        }
    }
}

impl Config {
    /// Load configuration from disk, falling back to defaults when the
    /// config file does not exist.
    pub fn load() -> Result<Self> {
        let path = paths::config_path(&paths::data_dir());
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| BerthError::InvalidConfig {
            reason: format!("Failed to read config: {}", e),
        })?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| BerthError::InvalidConfig {
                reason: format!("Failed to parse config: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let path = paths::config_path(&paths::data_dir());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BerthError::Io { path: parent.to_path_buf(), source: e })?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| BerthError::InvalidConfig {
            reason: format!("Failed to serialize config: {}", e),
        })?;
        std::fs::write(&path, content).map_err(|e| BerthError::Io { path, source: e })
    }

    /// Get the resolved data directory.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    fn validate(&self) -> Result<()> {
        if self.port_range_start == 0 || self.port_range_start > self.port_range_end {
            return Err(BerthError::InvalidConfig {
                reason: format!(
                    "Invalid port range {}-{}",
                    self.port_range_start, self.port_range_end
                ),
            });
        }
        Ok(())
    }
}
