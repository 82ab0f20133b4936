use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use yaraguard_common::utils::validate_url;
use yaraguard_simulator::SimulatorConfig;

use crate::error::{OperatorError, Result};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OperatorConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection to the hosted store. Both parameters are mandatory.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
}

fn default_request_timeout_sec() -> u64 {
    10
}

impl StoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Postgres URL for LISTEN/NOTIFY. Live updates are off without it.
    pub database_url: Option<String>,
    pub channel: String,
    pub install_triggers: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub alert_limit: usize,
    pub event_log_limit: usize,
    pub poll_interval_sec: u64,
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_sec)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub scale: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            channel: "yara_changes".to_string(),
            install_triggers: false,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            alert_limit: 10,
            event_log_limit: 20,
            poll_interval_sec: 5,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        // Manaus, central zone
        Self {
            center_latitude: -3.1150,
            center_longitude: -60.0250,
            scale: 8000.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl OperatorConfig {
    /// Reads the optional config file, then `YARA_*` environment variables
    /// (`YARA_STORE__URL`, `YARA_STORE__API_KEY`, ...).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("YARA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_settings(settings)
    }

    pub fn from_settings(settings: Config) -> Result<Self> {
        let config: OperatorConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.url.trim().is_empty() {
            return Err(OperatorError::Config("store.url is empty".to_string()));
        }
        validate_url(&self.store.url)
            .map_err(|e| OperatorError::Config(format!("store.url: {}", e)))?;
        if self.store.api_key.trim().is_empty() {
            return Err(OperatorError::Config("store.api_key is empty".to_string()));
        }
        if self.sync.alert_limit == 0 || self.sync.event_log_limit == 0 {
            return Err(OperatorError::Config("sync limits must be positive".to_string()));
        }
        if self.sync.poll_interval_sec == 0 {
            return Err(OperatorError::Config("sync.poll_interval_sec must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.simulator.sample_probability) {
            return Err(OperatorError::Config(
                "simulator.sample_probability must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
