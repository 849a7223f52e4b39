//! Device identity configuration
//!
//! The config file is written by the provisioning service as JSON with
//! camelCase keys. All three fields are required and must be non-empty;
//! a bad config is fatal at startup and a soft failure on mid-run reload.

use parking_lot::RwLock;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/rfid-agent/config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file missing: {0}")]
    Missing(PathBuf),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config field must be non-empty: {0}")]
    EmptyField(&'static str),
}

/// Immutable per-run device identity record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub device_serial: String,
    pub api_key: String,
    pub backend_url: String,
}

impl DeviceConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config: DeviceConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.device_serial.is_empty() {
            return Err(ConfigError::EmptyField("deviceSerial"));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::EmptyField("apiKey"));
        }
        if self.backend_url.is_empty() {
            return Err(ConfigError::EmptyField("backendUrl"));
        }
        Ok(())
    }

    /// Backend base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }
}

/// Holds the current device config for the process lifetime.
///
/// The config may be replaced wholesale after a reader fault; readers get
/// a consistent snapshot via `current()`.
pub struct Identity {
    path: PathBuf,
    current: RwLock<Arc<DeviceConfig>>,
}

impl Identity {
    /// Load the config from disk. Fatal at startup when this fails.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = DeviceConfig::from_file(&path)?;
        info!(
            device_serial = %config.device_serial,
            backend_url = %config.backend_url,
            "config_loaded"
        );
        Ok(Self { path, current: RwLock::new(Arc::new(config)) })
    }

    /// Snapshot of the current config
    pub fn current(&self) -> Arc<DeviceConfig> {
        self.current.read().clone()
    }

    /// Re-read the config from disk, replacing it wholesale on success.
    /// A failed reload keeps the previous config in place.
    pub fn reload(&self) {
        match DeviceConfig::from_file(&self.path) {
            Ok(config) => {
                *self.current.write() = Arc::new(config);
                info!("config_reloaded");
            }
            Err(e) => {
                warn!(error = %e, "config_reload_failed_keeping_previous");
            }
        }
    }
}
