use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use super::CallbackRegistry;
use crate::metrics::CALLBACK_EVICTIONS;
use crate::utils::async_task::run_periodic;
use crate::DeliveryError;
use crate::NotificationConfig;

pub(crate) const JANITOR_TASK: &str = "callback_janitor";
pub(crate) const EVICTION_PROBE_DEAD: &str = "probe_dead";
pub(crate) const EVICTION_PROBE_ERROR: &str = "probe_error";

/// Probes every registered callback and evicts the dead ones.
///
/// Probes run concurrently, each bounded by `probe_timeout`, so a single
/// unresponsive subscriber costs the cycle at most one timeout. A probe that
/// panics counts as a probe error for its own handle only.
#[derive(Debug, Clone)]
pub struct CallbackJanitor {
    callbacks: Arc<CallbackRegistry>,
    interval: Duration,
    probe_timeout: Duration,
}

impl CallbackJanitor {
    pub fn new(
        callbacks: Arc<CallbackRegistry>,
        config: &NotificationConfig,
    ) -> Self {
        Self {
            callbacks,
            interval: config.janitor_interval(),
            probe_timeout: config.probe_timeout(),
        }
    }

    /// One probe cycle. Returns the evicted subscriber ids, sorted.
    pub async fn sweep_once(&self) -> Vec<String> {
        let probes = self.callbacks.entries().into_iter().map(|(subscriber, entry)| async move {
            let probe = AssertUnwindSafe(timeout(self.probe_timeout, entry.notifier.probe_alive()));
            let outcome = match probe.catch_unwind().await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(DeliveryError::Timeout(self.probe_timeout)),
                Err(_) => Err(DeliveryError::Rejected("probe panicked".to_string())),
            };
            (subscriber, entry.handle_id, outcome)
        });

        let mut evicted = Vec::new();
        for (subscriber, handle_id, outcome) in join_all(probes).await {
            let cause = match outcome {
                Ok(true) => continue,
                Ok(false) => {
                    warn!(subscriber = %subscriber, handle_id, "callback probe reported dead handle");
                    EVICTION_PROBE_DEAD
                }
                Err(e) => {
                    warn!(subscriber = %subscriber, handle_id, "callback probe failed: {}", e);
                    EVICTION_PROBE_ERROR
                }
            };
            if self.callbacks.evict_if_match(&subscriber, handle_id) {
                CALLBACK_EVICTIONS.with_label_values(&[cause]).inc();
                evicted.push(subscriber);
            }
        }

        evicted.sort();
        if !evicted.is_empty() {
            debug!(evicted = ?evicted, "janitor cycle evicted callbacks");
        }
        evicted
    }

    pub(crate) async fn run(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) {
        let period = self.interval;
        run_periodic(JANITOR_TASK, period, shutdown_signal, move || {
            let janitor = self.clone();
            async move {
                janitor.sweep_once().await;
                Ok(())
            }
        })
        .await;
    }
}
