//! Branch liveness, load tracking and routing.
//!
//! - [`BranchRegistry`]: concurrent table of branch identity/state
//! - [`HealthMonitor`]: stale-heartbeat sweeps
//! - [`StatsRefresher`]: periodic load metric recomputation
//! - [`Selector`]: load-aware / round-robin branch selection

mod health_monitor;
mod host_metrics;
mod record;
mod registry;
mod selector;
mod stats_refresher;

pub use health_monitor::*;
pub use host_metrics::*;
pub use record::*;
pub use registry::*;
pub use selector::*;
pub use stats_refresher::*;

#[cfg(test)]
mod record_test;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Host/process telemetry for a branch.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetricsSource: Send + Sync + 'static {
    /// Fields the source cannot observe stay `None`.
    async fn sample(
        &self,
        branch: &BranchRecord,
    ) -> Result<MetricsSample>;
}

/// Stock availability per branch.
#[cfg_attr(test, automock)]
pub trait StockLookup: Send + Sync + 'static {
    /// Whether `branch` holds at least `quantity` units of `item_id`
    fn has_quantity(
        &self,
        branch: &str,
        item_id: &str,
        quantity: u64,
    ) -> Result<bool>;
}
