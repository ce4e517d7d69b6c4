//! Heartbeat-recency sweeps.
//!
//! Two independent periodic checks age out stale branches:
//! - the primary sweep (default every 30s, 120s timeout) is the canonical
//!   offline SLA and reports every newly-offline branch;
//! - the fast check (default every 5s, 10s timeout) flags silent branches early.
//!
//! Both write the same idempotent `active = false` transition, so whichever
//! notices staleness first wins. Only register/heartbeat bring a branch back.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use super::BranchRegistry;
use crate::metrics::BRANCH_OFFLINE_TOTAL;
use crate::utils::async_task::run_periodic;
use crate::MonitorConfig;

pub(crate) const SWEEP_TASK: &str = "health_sweep";
pub(crate) const FAST_CHECK_TASK: &str = "heartbeat_fast_check";

#[derive(Debug, Clone)]
pub struct HealthMonitor {
    registry: Arc<BranchRegistry>,
    sweep_interval: Duration,
    offline_timeout: Duration,
    fast_check_interval: Duration,
    fast_check_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<BranchRegistry>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            registry,
            sweep_interval: config.sweep_interval(),
            offline_timeout: config.offline_timeout(),
            fast_check_interval: config.fast_check_interval(),
            fast_check_timeout: config.fast_check_timeout(),
        }
    }

    /// Primary sweep: marks branches silent for longer than the offline
    /// timeout as inactive and returns the newly-offline names.
    pub fn sweep(
        &self,
        now: Instant,
    ) -> Vec<String> {
        let newly_offline = self.registry.mark_stale_inactive(now, self.offline_timeout);
        if newly_offline.is_empty() {
            debug!("health sweep: no newly offline branches");
        } else {
            BRANCH_OFFLINE_TOTAL
                .with_label_values(&[SWEEP_TASK])
                .inc_by(newly_offline.len() as u64);
            warn!(
                branches = ?newly_offline,
                timeout = ?self.offline_timeout,
                "health sweep marked branches offline"
            );
        }
        newly_offline
    }

    /// Fast check: same transition with the shorter heartbeat timeout.
    pub fn fast_check(
        &self,
        now: Instant,
    ) -> Vec<String> {
        let newly_inactive = self.registry.mark_stale_inactive(now, self.fast_check_timeout);
        if !newly_inactive.is_empty() {
            BRANCH_OFFLINE_TOTAL
                .with_label_values(&[FAST_CHECK_TASK])
                .inc_by(newly_inactive.len() as u64);
            warn!(
                branches = ?newly_inactive,
                timeout = ?self.fast_check_timeout,
                "heartbeat check marked branches inactive"
            );
        }
        newly_inactive
    }

    pub(crate) async fn run_sweep(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) {
        let period = self.sweep_interval;
        run_periodic(SWEEP_TASK, period, shutdown_signal, move || {
            let monitor = self.clone();
            async move {
                monitor.sweep(Instant::now());
                Ok(())
            }
        })
        .await;
    }

    pub(crate) async fn run_fast_check(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) {
        let period = self.fast_check_interval;
        run_periodic(FAST_CHECK_TASK, period, shutdown_signal, move || {
            let monitor = self.clone();
            async move {
                monitor.fast_check(Instant::now());
                Ok(())
            }
        })
        .await;
    }
}
