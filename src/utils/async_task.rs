use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::metrics::SCHEDULER_TASK_FAILURES;
use crate::Result;

// Helper function to spawn tasks and track their JoinHandles
pub(crate) fn spawn_task<F, Fut>(
    name: &str,
    task_fn: F,
    handles: Option<&mut Vec<tokio::task::JoinHandle<()>>>,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let name = name.to_string();
    let handle = tokio::spawn(async move {
        if let Err(e) = task_fn().await {
            error!("spawned task: {name} stopped or encountered an error: {:?}", e);
        }
    });

    if let Some(h) = handles {
        h.push(handle);
    }
}

/// Runs `tick_fn` every `period` until the shutdown signal fires.
///
/// Every cycle is fault isolated: an `Err` or a panic inside one cycle is
/// logged and counted, and the next tick runs as scheduled. The first cycle
/// runs one full `period` after start.
pub(crate) async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown_signal: watch::Receiver<()>,
    mut tick_fn: F,
) where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
{
    info!(task = name, period = ?period, "periodic task started");

    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match AssertUnwindSafe(tick_fn()).catch_unwind().await {
                    Ok(Ok(())) => {
                        debug!(task = name, "periodic cycle completed");
                    }
                    Ok(Err(e)) => {
                        SCHEDULER_TASK_FAILURES.with_label_values(&[name]).inc();
                        error!(task = name, "periodic cycle failed: {:?}", e);
                    }
                    Err(_) => {
                        SCHEDULER_TASK_FAILURES.with_label_values(&[name]).inc();
                        error!(task = name, "periodic cycle panicked");
                    }
                }
            }
            _ = shutdown_signal.changed() => {
                info!(task = name, "periodic task received shutdown signal");
                break;
            }
        }
    }

    debug!(task = name, "periodic task stopped");
}
