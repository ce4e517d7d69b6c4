use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::metrics::BRANCH_LOAD_SCORE;
use crate::BranchRecord;
use crate::BranchRegistry;
use crate::CallbackJanitor;
use crate::ChannelNotifier;
use crate::GroupSelector;
use crate::HealthMonitor;
use crate::HealthStatus;
use crate::HubConfig;
use crate::HubSummary;
use crate::LoadStats;
use crate::NotificationDispatcher;
use crate::NotificationRecord;
use crate::Notifier;
use crate::Result;
use crate::Selector;
use crate::StatsRefresher;

/// Central coordinator shared by branch processes, routing clients and
/// notification producers.
///
/// Built by [`crate::HubBuilder`], which also starts the background workers.
/// All methods take `&self`; the hub is meant to live behind an `Arc`.
pub struct Hub {
    pub(crate) config: Arc<HubConfig>,
    pub(crate) registry: Arc<BranchRegistry>,
    pub(crate) selector: Selector,
    pub(crate) health_monitor: HealthMonitor,
    pub(crate) stats_refresher: StatsRefresher,
    pub(crate) dispatcher: NotificationDispatcher,
    pub(crate) janitor: CallbackJanitor,
    pub(crate) workers: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Hub {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("branches", &self.registry.len())
            .field("active", &self.registry.active_count())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl Hub {
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    // --- branch side ---

    /// Upserts the branch by name; it becomes active with a fresh heartbeat.
    /// Reported stats are re-scored like [`Hub::update_stats`].
    pub fn register(
        &self,
        mut record: BranchRecord,
    ) -> Result<()> {
        record.stats = record.stats.map(LoadStats::recompute);
        if let Some(stats) = record.stats {
            BRANCH_LOAD_SCORE
                .with_label_values(&[&record.name])
                .set(stats.load_score);
        }
        self.registry.register(record)
    }

    pub fn unregister(
        &self,
        name: &str,
    ) -> bool {
        let removed = self.registry.unregister(name);
        if removed {
            let _ = BRANCH_LOAD_SCORE.remove_label_values(&[name]);
        }
        removed
    }

    /// Ignored for unknown names
    pub fn heartbeat(
        &self,
        name: &str,
    ) -> bool {
        self.registry.heartbeat(name)
    }

    /// Stores branch-reported stats. The load score is always recomputed from
    /// the reported inputs.
    pub fn update_stats(
        &self,
        name: &str,
        stats: LoadStats,
    ) -> bool {
        let stats = stats.recompute();
        let updated = self.registry.update_stats(name, stats);
        if updated {
            BRANCH_LOAD_SCORE
                .with_label_values(&[name])
                .set(stats.load_score);
        } else {
            debug!(branch = %name, "stats for unknown branch ignored");
        }
        updated
    }

    // --- routing ---

    pub fn best_available(&self) -> Option<BranchRecord> {
        self.selector.best_available()
    }

    pub fn best_for_demand(
        &self,
        item_id: &str,
        quantity: u64,
    ) -> Result<Option<BranchRecord>> {
        self.selector.best_for_demand(item_id, quantity)
    }

    pub fn list_all(&self) -> Vec<BranchRecord> {
        self.selector.list_all()
    }

    pub fn load_distribution(&self) -> BTreeMap<String, f64> {
        self.selector.load_distribution()
    }

    pub fn health_status(&self) -> BTreeMap<String, HealthStatus> {
        self.selector.health_status()
    }

    pub fn summary(&self) -> HubSummary {
        self.selector.summary()
    }

    // --- notifications ---

    pub async fn register_callback(
        &self,
        subscriber_id: &str,
        notifier: Arc<dyn Notifier>,
    ) -> Result<NotificationRecord> {
        self.dispatcher
            .register_callback(subscriber_id, notifier)
            .await
    }

    /// Registers an in-process subscriber and returns its event stream. The
    /// "connected" notification is the first item on it.
    pub async fn subscribe(
        &self,
        subscriber_id: &str,
    ) -> Result<mpsc::Receiver<NotificationRecord>> {
        let (notifier, receiver) = ChannelNotifier::pair(self.config.notification.subscriber_buffer);
        self.dispatcher
            .register_callback(subscriber_id, Arc::new(notifier))
            .await?;
        Ok(receiver)
    }

    pub fn unregister_callback(
        &self,
        subscriber_id: &str,
    ) -> bool {
        self.dispatcher.unregister_callback(subscriber_id)
    }

    pub fn is_connected(
        &self,
        subscriber_id: &str,
    ) -> bool {
        self.dispatcher.callbacks().is_registered(subscriber_id)
    }

    pub fn connected_count(&self) -> usize {
        self.dispatcher.callbacks().connected_count()
    }

    pub async fn send(
        &self,
        target_id: &str,
        record: NotificationRecord,
    ) -> Result<NotificationRecord> {
        self.dispatcher.send(target_id, record).await
    }

    pub async fn send_to_group(
        &self,
        selector: &GroupSelector,
        record: NotificationRecord,
    ) -> Result<Vec<NotificationRecord>> {
        self.dispatcher.send_to_group(selector, record).await
    }

    pub fn list_recent(
        &self,
        subscriber_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>> {
        self.dispatcher.list_recent(subscriber_id, limit)
    }

    pub fn mark_read(
        &self,
        subscriber_id: &str,
        ids: &[u64],
    ) -> Result<usize> {
        self.dispatcher.mark_read(subscriber_id, ids)
    }

    pub fn unread_count(
        &self,
        subscriber_id: &str,
    ) -> Result<usize> {
        self.dispatcher.unread_count(subscriber_id)
    }

    // --- maintenance ---

    /// Runs both heartbeat checks immediately; returns the branches taken
    /// offline, sorted.
    pub fn sweep_now(&self) -> Vec<String> {
        let now = tokio::time::Instant::now();
        let mut offline = self.health_monitor.sweep(now);
        offline.extend(self.health_monitor.fast_check(now));
        offline.sort();
        offline
    }

    pub async fn refresh_stats_now(&self) -> Result<usize> {
        self.stats_refresher.refresh_once().await
    }

    pub async fn probe_callbacks_now(&self) -> Vec<String> {
        self.janitor.sweep_once().await
    }

    /// Waits for the background workers after the shutdown signal was sent.
    ///
    /// Workers still running once the configured grace period elapses are
    /// aborted. Returns `true` when every worker stopped on its own.
    pub async fn shutdown(&self) -> bool {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        if handles.is_empty() {
            return true;
        }
        let grace = self.config.shutdown_grace();
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        info!(workers = handles.len(), grace = ?grace, "waiting for background workers");
        match tokio::time::timeout(grace, join_all(handles)).await {
            Ok(results) => {
                for e in results.into_iter().filter_map(|r| r.err()) {
                    warn!("background worker ended abnormally: {:?}", e);
                }
                info!("background workers stopped");
                true
            }
            Err(_) => {
                warn!(grace = ?grace, "workers still running after grace period, aborting");
                for abort in aborts {
                    abort.abort();
                }
                false
            }
        }
    }

    /// Number of worker handles not yet collected by [`Hub::shutdown`]
    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }
}
