use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Push delivery and callback janitor settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Period of the callback liveness probe
    #[serde(default = "default_janitor_interval")]
    pub janitor_interval_ms: u64,

    /// Upper bound for one push attempt
    #[serde(default = "default_push_timeout")]
    pub push_timeout_ms: u64,

    /// Upper bound for one liveness probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Lower clamp applied to `list_recent` limits
    #[serde(default = "default_list_limit_min")]
    pub list_limit_min: usize,

    /// Upper clamp applied to `list_recent` limits
    #[serde(default = "default_list_limit_max")]
    pub list_limit_max: usize,

    /// Buffer of in-process subscriber channels
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            janitor_interval_ms: default_janitor_interval(),
            push_timeout_ms: default_push_timeout(),
            probe_timeout_ms: default_probe_timeout(),
            list_limit_min: default_list_limit_min(),
            list_limit_max: default_list_limit_max(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

impl NotificationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.janitor_interval_ms == 0 {
            return Err(Error::InvalidConfig("janitor_interval_ms must be greater than 0".into()));
        }

        if self.push_timeout_ms == 0 || self.probe_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "push_timeout_ms and probe_timeout_ms must be at least 1ms".into(),
            ));
        }

        if self.list_limit_min == 0 || self.list_limit_min > self.list_limit_max {
            return Err(Error::InvalidConfig(format!(
                "list limits must satisfy 1 <= list_limit_min ({}) <= list_limit_max ({})",
                self.list_limit_min, self.list_limit_max
            )));
        }

        if self.subscriber_buffer == 0 {
            return Err(Error::InvalidConfig("subscriber_buffer must be greater than 0".into()));
        }

        Ok(())
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_millis(self.janitor_interval_ms)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Clamps a caller supplied limit into the configured range
    pub fn clamp_limit(
        &self,
        limit: usize,
    ) -> usize {
        limit.clamp(self.list_limit_min, self.list_limit_max)
    }
}

fn default_janitor_interval() -> u64 {
    30_000
}
fn default_push_timeout() -> u64 {
    2_000
}
fn default_probe_timeout() -> u64 {
    2_000
}
fn default_list_limit_min() -> usize {
    1
}
fn default_list_limit_max() -> usize {
    100
}
fn default_subscriber_buffer() -> usize {
    64
}
