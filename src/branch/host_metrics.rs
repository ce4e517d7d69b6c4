use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use sysinfo::System;

use super::BranchRecord;
use super::MetricsSample;
use super::MetricsSource;
use crate::Error;
use crate::Result;

/// [`MetricsSource`] reading CPU and memory of the local host.
///
/// Only branches on a loopback host are sampled; remote branches get an empty
/// sample so their own reports stand. Connection and order queue figures are
/// never observable from here. The first CPU reading after construction is 0.
#[derive(Clone)]
pub struct HostMetricsSource {
    system: Arc<Mutex<System>>,
}

impl std::fmt::Debug for HostMetricsSource {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("HostMetricsSource").finish()
    }
}

impl Default for HostMetricsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HostMetricsSource {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();
        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }
}

#[async_trait]
impl MetricsSource for HostMetricsSource {
    async fn sample(
        &self,
        branch: &BranchRecord,
    ) -> Result<MetricsSample> {
        if !is_local_host(&branch.host) {
            return Ok(MetricsSample::default());
        }

        let system = self.system.clone();
        tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let mut system = system.lock();
            system.refresh_cpu();
            system.refresh_memory();

            let cpu_usage = system.global_cpu_info().cpu_usage() as f64;
            let total = system.total_memory();
            let memory_usage = if total == 0 {
                None
            } else {
                Some(system.used_memory() as f64 * 100.0 / total as f64)
            };

            MetricsSample {
                cpu_usage: Some(cpu_usage),
                memory_usage,
                active_connections: None,
                pending_orders: None,
                response_time_ms: Some(started.elapsed().as_secs_f64() * 1000.0),
            }
        })
        .await
        .map_err(Error::TaskJoin)
    }
}

pub(crate) fn is_local_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}
