use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tokio::time::Instant;

// Load score weights; they sum to 1.0 so the score stays within [0, 1].
const CPU_WEIGHT: f64 = 0.30;
const MEMORY_WEIGHT: f64 = 0.20;
const CONNECTIONS_WEIGHT: f64 = 0.20;
const PENDING_ORDERS_WEIGHT: f64 = 0.20;
const RESPONSE_TIME_WEIGHT: f64 = 0.05;
const ORDERS_TODAY_WEIGHT: f64 = 0.05;

// Half-saturation points: an input equal to its constant contributes half its weight.
const CONNECTIONS_HALF_SATURATION: f64 = 50.0;
const PENDING_ORDERS_HALF_SATURATION: f64 = 20.0;
const RESPONSE_TIME_HALF_SATURATION_MS: f64 = 500.0;
const ORDERS_TODAY_HALF_SATURATION: f64 = 500.0;

/// Identity and liveness state of one registered branch.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchRecord {
    /// Unique key
    pub name: String,
    pub host: String,
    pub port: u16,
    pub active: bool,
    /// Monotonic time of the last register/heartbeat
    pub last_heartbeat_at: Instant,
    pub stats: Option<LoadStats>,
}

impl BranchRecord {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            active: true,
            last_heartbeat_at: Instant::now(),
            stats: None,
        }
    }

    pub fn with_stats(
        mut self,
        stats: LoadStats,
    ) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Zero when `now` precedes the last heartbeat
    pub fn heartbeat_age(
        &self,
        now: Instant,
    ) -> Duration {
        now.saturating_duration_since(self.last_heartbeat_at)
    }

    pub fn load_score(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.load_score)
    }

    /// "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-branch load metrics.
///
/// `load_score` is derived from the other fields by [`LoadStats::recompute`]; it is
/// only meaningful for ranking branches against each other. Higher means busier.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadStats {
    /// Percent, 0..=100
    pub cpu_usage: f64,
    /// Percent, 0..=100
    pub memory_usage: f64,
    pub active_connections: u32,
    pub pending_orders: u32,
    pub orders_processed_today: u64,
    pub total_stock_items: u64,
    pub response_time_ms: f64,
    pub load_score: f64,
}

impl LoadStats {
    /// Returns a copy whose `load_score` reflects the current inputs.
    pub fn recompute(mut self) -> Self {
        self.load_score = compute_load_score(&self);
        self
    }

    /// Overlays a metrics sample on top of `previous` and refreshes the
    /// factual counters. Fields the sample leaves empty keep their last value.
    pub fn merge_sample(
        previous: Option<&LoadStats>,
        sample: &MetricsSample,
        orders_processed_today: u64,
        total_stock_items: u64,
    ) -> Self {
        let base = previous.copied().unwrap_or_default();
        LoadStats {
            cpu_usage: sample.cpu_usage.unwrap_or(base.cpu_usage),
            memory_usage: sample.memory_usage.unwrap_or(base.memory_usage),
            active_connections: sample.active_connections.unwrap_or(base.active_connections),
            pending_orders: sample.pending_orders.unwrap_or(base.pending_orders),
            orders_processed_today,
            total_stock_items,
            response_time_ms: sample.response_time_ms.unwrap_or(base.response_time_ms),
            load_score: 0.0,
        }
        .recompute()
    }
}

/// Weighted sum of normalised inputs, clamped to [0, 1].
///
/// Every term is non-decreasing in its input. Stock on hand is capacity rather
/// than burden and carries no weight.
pub fn compute_load_score(stats: &LoadStats) -> f64 {
    let score = CPU_WEIGHT * percent(stats.cpu_usage)
        + MEMORY_WEIGHT * percent(stats.memory_usage)
        + CONNECTIONS_WEIGHT
            * saturate(stats.active_connections as f64, CONNECTIONS_HALF_SATURATION)
        + PENDING_ORDERS_WEIGHT
            * saturate(stats.pending_orders as f64, PENDING_ORDERS_HALF_SATURATION)
        + RESPONSE_TIME_WEIGHT
            * saturate(stats.response_time_ms, RESPONSE_TIME_HALF_SATURATION_MS)
        + ORDERS_TODAY_WEIGHT
            * saturate(stats.orders_processed_today as f64, ORDERS_TODAY_HALF_SATURATION);
    score.clamp(0.0, 1.0)
}

fn percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0) / 100.0
}

fn saturate(
    value: f64,
    half: f64,
) -> f64 {
    if value.is_nan() || value <= 0.0 {
        return 0.0;
    }
    value / (value + half)
}

/// Partial host/process metrics for one branch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricsSample {
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub active_connections: Option<u32>,
    pub pending_orders: Option<u32>,
    pub response_time_ms: Option<f64>,
}

/// Coarse health classification, always derived on query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Offline,
}

impl fmt::Display for HealthStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Warning => "WARNING",
            HealthStatus::Critical => "CRITICAL",
            HealthStatus::Offline => "OFFLINE",
        };
        f.write_str(s)
    }
}
