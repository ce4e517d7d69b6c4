//! Configuration management for the branch hub.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`HUB__` prefix)
//! - Component-wise validation
mod cluster;
mod monitor;
mod monitoring;
mod notification;
mod storage;
pub use cluster::*;
pub use monitor::*;
pub use monitoring::*;
pub use notification::*;
pub use storage::*;


use std::env;
use std::time::Duration;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

const ENV_PREFIX: &str = "HUB";

/// Main configuration container for the hub components
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HubConfig {
    /// Branches registered at start-up
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Heartbeat sweeps, stats refresh and load thresholds
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Push delivery and callback janitor
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Durable store and log locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// Prometheus exporter
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Bounded wait for background workers after the shutdown signal
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            monitor: MonitorConfig::default(),
            notification: NotificationConfig::default(),
            storage: StorageConfig::default(),
            monitoring: MonitoringConfig::default(),
            shutdown_grace_ms: default_shutdown_grace(),
        }
    }
}

impl HubConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `HUB__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so that `with_override_config()` can still be applied.
    /// Callers MUST call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/hub.toml");
    /// std::env::set_var("HUB__MONITOR__OFFLINE_TIMEOUT_MS", "60000");
    /// let cfg = HubConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.cluster.validate()?;
        self.monitor.validate()?;
        self.notification.validate()?;
        self.storage.validate()?;
        self.monitoring.validate()?;

        if self.shutdown_grace_ms == 0 {
            return Err(Error::InvalidConfig("shutdown_grace_ms must be greater than 0".into()));
        }
        Ok(self)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

fn default_shutdown_grace() -> u64 {
    5_000
}
