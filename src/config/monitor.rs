use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Timers and thresholds driving branch liveness and load classification
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Period of the primary stale-branch sweep
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ms: u64,

    /// Heartbeat age after which the primary sweep marks a branch offline.
    /// This is also the SLA used when classifying health.
    #[serde(default = "default_offline_timeout")]
    pub offline_timeout_ms: u64,

    /// Period of the fast heartbeat check
    #[serde(default = "default_fast_check_interval")]
    pub fast_check_interval_ms: u64,

    /// Heartbeat age after which the fast check marks a branch inactive
    #[serde(default = "default_fast_check_timeout")]
    pub fast_check_timeout_ms: u64,

    /// Period of the load statistics refresh
    #[serde(default = "default_stats_refresh_interval")]
    pub stats_refresh_interval_ms: u64,

    /// Upper bound for one metrics sample of one branch
    #[serde(default = "default_metrics_sample_timeout")]
    pub metrics_sample_timeout_ms: u64,

    /// Load score strictly above which a branch is CRITICAL
    #[serde(default = "default_critical_load")]
    pub critical_load: f64,

    /// Load score strictly above which a branch is WARNING
    #[serde(default = "default_warning_load")]
    pub warning_load: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval(),
            offline_timeout_ms: default_offline_timeout(),
            fast_check_interval_ms: default_fast_check_interval(),
            fast_check_timeout_ms: default_fast_check_timeout(),
            stats_refresh_interval_ms: default_stats_refresh_interval(),
            metrics_sample_timeout_ms: default_metrics_sample_timeout(),
            critical_load: default_critical_load(),
            warning_load: default_warning_load(),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("sweep_interval_ms", self.sweep_interval_ms),
            ("offline_timeout_ms", self.offline_timeout_ms),
            ("fast_check_interval_ms", self.fast_check_interval_ms),
            ("fast_check_timeout_ms", self.fast_check_timeout_ms),
            ("stats_refresh_interval_ms", self.stats_refresh_interval_ms),
            ("metrics_sample_timeout_ms", self.metrics_sample_timeout_ms),
        ] {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be greater than 0", name)));
            }
        }

        if self.fast_check_timeout_ms > self.offline_timeout_ms {
            return Err(Error::InvalidConfig(format!(
                "fast_check_timeout_ms ({}) must not exceed offline_timeout_ms ({})",
                self.fast_check_timeout_ms, self.offline_timeout_ms
            )));
        }

        if !(self.warning_load > 0.0
            && self.warning_load < self.critical_load
            && self.critical_load <= 1.0)
        {
            return Err(Error::InvalidConfig(format!(
                "load thresholds must satisfy 0 < warning_load ({}) < critical_load ({}) <= 1",
                self.warning_load, self.critical_load
            )));
        }

        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn offline_timeout(&self) -> Duration {
        Duration::from_millis(self.offline_timeout_ms)
    }

    pub fn fast_check_interval(&self) -> Duration {
        Duration::from_millis(self.fast_check_interval_ms)
    }

    pub fn fast_check_timeout(&self) -> Duration {
        Duration::from_millis(self.fast_check_timeout_ms)
    }

    pub fn stats_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.stats_refresh_interval_ms)
    }

    pub fn metrics_sample_timeout(&self) -> Duration {
        Duration::from_millis(self.metrics_sample_timeout_ms)
    }
}

// in ms
fn default_sweep_interval() -> u64 {
    30_000
}
fn default_offline_timeout() -> u64 {
    120_000
}
fn default_fast_check_interval() -> u64 {
    5_000
}
fn default_fast_check_timeout() -> u64 {
    10_000
}
fn default_stats_refresh_interval() -> u64 {
    60_000
}
fn default_metrics_sample_timeout() -> u64 {
    2_000
}
fn default_critical_load() -> f64 {
    0.8
}
fn default_warning_load() -> f64 {
    0.6
}
