use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use super::BranchRecord;
use super::BranchRegistry;
use super::LoadStats;
use super::MetricsSample;
use super::MetricsSource;
use crate::metrics::BRANCH_LOAD_SCORE;
use crate::utils::async_task::run_periodic;
use crate::MonitorConfig;
use crate::PersistentStore;
use crate::Result;

pub(crate) const STATS_REFRESH_TASK: &str = "stats_refresh";

/// Recomputes load statistics of every active branch.
///
/// Factual counters (orders today, stock on hand) come from the persistent
/// store; the remaining inputs come from the injected [`MetricsSource`].
#[derive(Clone)]
pub struct StatsRefresher {
    registry: Arc<BranchRegistry>,
    store: Arc<dyn PersistentStore>,
    metrics_source: Arc<dyn MetricsSource>,
    interval: Duration,
    sample_timeout: Duration,
}

impl StatsRefresher {
    pub fn new(
        registry: Arc<BranchRegistry>,
        store: Arc<dyn PersistentStore>,
        metrics_source: Arc<dyn MetricsSource>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            registry,
            store,
            metrics_source,
            interval: config.stats_refresh_interval(),
            sample_timeout: config.metrics_sample_timeout(),
        }
    }

    /// One refresh pass. Returns how many branches received new stats.
    ///
    /// Branches whose counters cannot be read are skipped for this pass; a
    /// failed or slow metrics sample degrades to an empty sample.
    pub async fn refresh_once(&self) -> Result<usize> {
        let mut refreshed = 0;
        for record in self.registry.snapshot_active() {
            let counters = self
                .store
                .orders_today(&record.name)
                .and_then(|orders| Ok((orders, self.store.stock_item_count(&record.name)?)));
            let (orders_today, stock_items) = match counters {
                Ok(c) => c,
                Err(e) => {
                    warn!(branch = %record.name, "failed to read branch counters: {:?}", e);
                    continue;
                }
            };

            let sample = self.sample(&record).await;
            // merge against the live entry: a branch report may have landed while sampling
            let merged = self.registry.merge_stats(&record.name, |current| {
                LoadStats::merge_sample(current, &sample, orders_today, stock_items)
            });

            if let Some(stats) = merged {
                BRANCH_LOAD_SCORE
                    .with_label_values(&[&record.name])
                    .set(stats.load_score);
                debug!(branch = %record.name, load_score = stats.load_score, "stats refreshed");
                refreshed += 1;
            }
        }
        Ok(refreshed)
    }

    async fn sample(
        &self,
        record: &BranchRecord,
    ) -> MetricsSample {
        let branch = &record.name;
        match timeout(self.sample_timeout, self.metrics_source.sample(record)).await {
            Ok(Ok(sample)) => sample,
            Ok(Err(e)) => {
                warn!(branch = %branch, "metrics sample failed: {:?}", e);
                MetricsSample::default()
            }
            Err(_) => {
                warn!(branch = %branch, timeout = ?self.sample_timeout, "metrics sample timed out");
                MetricsSample::default()
            }
        }
    }

    pub(crate) async fn run(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) {
        let period = self.interval;
        run_periodic(STATS_REFRESH_TASK, period, shutdown_signal, move || {
            let refresher = self.clone();
            async move {
                refresher.refresh_once().await?;
                Ok(())
            }
        })
        .await;
    }
}
