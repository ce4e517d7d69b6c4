//! Branch selection over registry snapshots.
//!
//! Ranking is load-based whenever any candidate has stats: the candidate with
//! the lowest load score wins, ties going to the lexicographically first name.
//! Without any stats the selector falls back to round-robin over the
//! name-sorted candidate list, driven by a monotonically increasing cursor.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use autometrics::autometrics;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use super::BranchRecord;
use super::BranchRegistry;
use super::HealthStatus;
use super::StockLookup;
use crate::Error;
use crate::MonitorConfig;
use crate::Result;
use crate::API_SLO;

/// Aggregate view of the branch fleet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubSummary {
    pub total: usize,
    pub active: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    pub offline: usize,
    /// Mean load score of active branches reporting stats
    pub average_load: Option<f64>,
}

pub struct Selector {
    registry: Arc<BranchRegistry>,
    stock: Arc<dyn StockLookup>,
    cursor: AtomicUsize,
    offline_timeout: Duration,
    warning_load: f64,
    critical_load: f64,
}

impl std::fmt::Debug for Selector {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}

impl Selector {
    pub fn new(
        registry: Arc<BranchRegistry>,
        stock: Arc<dyn StockLookup>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            registry,
            stock,
            cursor: AtomicUsize::new(0),
            offline_timeout: config.offline_timeout(),
            warning_load: config.warning_load,
            critical_load: config.critical_load,
        }
    }

    /// Least loaded active branch, or the next one in round-robin order.
    /// `None` when no branch is active.
    #[autometrics(objective = API_SLO)]
    pub fn best_available(&self) -> Option<BranchRecord> {
        let candidates = self.registry.snapshot_active();
        self.pick(candidates)
    }

    /// Same policy as [`Selector::best_available`], restricted to active
    /// branches holding at least `quantity` units of `item_id`.
    ///
    /// A branch whose stock cannot be read is treated as not qualifying.
    ///
    /// # Errors
    /// `Error::Validation` when `item_id` is blank.
    #[autometrics(objective = API_SLO)]
    pub fn best_for_demand(
        &self,
        item_id: &str,
        quantity: u64,
    ) -> Result<Option<BranchRecord>> {
        if item_id.trim().is_empty() {
            return Err(Error::Validation("item id cannot be empty".into()));
        }

        let candidates: Vec<BranchRecord> = self
            .registry
            .snapshot_active()
            .into_iter()
            .filter(|record| {
                match self.stock.has_quantity(&record.name, item_id, quantity) {
                    Ok(has) => has,
                    Err(e) => {
                        warn!(branch = %record.name, item = %item_id, "stock lookup failed: {:?}", e);
                        false
                    }
                }
            })
            .collect();

        if candidates.is_empty() {
            debug!(item = %item_id, quantity, "no active branch can serve demand");
        }
        Ok(self.pick(candidates))
    }

    /// `candidates` must be sorted by name.
    fn pick(
        &self,
        candidates: Vec<BranchRecord>,
    ) -> Option<BranchRecord> {
        if candidates.is_empty() {
            return None;
        }

        let least_loaded = candidates
            .iter()
            .filter_map(|record| record.load_score().map(|score| (score, record)))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, record)| record.clone());
        if least_loaded.is_some() {
            return least_loaded;
        }

        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        candidates.into_iter().nth(idx)
    }

    /// OFFLINE if inactive or silent past the offline SLA; otherwise
    /// CRITICAL / WARNING / HEALTHY by load score. Missing stats are WARNING.
    pub fn health_status_of(
        &self,
        record: &BranchRecord,
        now: Instant,
    ) -> HealthStatus {
        classify(
            record,
            now,
            self.offline_timeout,
            self.warning_load,
            self.critical_load,
        )
    }

    /// All branches, sorted by name
    pub fn list_all(&self) -> Vec<BranchRecord> {
        self.registry.snapshot_all()
    }

    /// name -> load score; 0.0 for inactive branches and branches without stats
    pub fn load_distribution(&self) -> BTreeMap<String, f64> {
        self.registry
            .snapshot_all()
            .into_iter()
            .map(|record| {
                let score = if record.active {
                    record.load_score().unwrap_or(0.0)
                } else {
                    0.0
                };
                (record.name, score)
            })
            .collect()
    }

    /// name -> current health status
    pub fn health_status(&self) -> BTreeMap<String, HealthStatus> {
        let now = Instant::now();
        self.registry
            .snapshot_all()
            .into_iter()
            .map(|record| {
                let status = self.health_status_of(&record, now);
                (record.name, status)
            })
            .collect()
    }

    pub fn summary(&self) -> HubSummary {
        let now = Instant::now();
        let records = self.registry.snapshot_all();
        let mut summary = HubSummary {
            total: records.len(),
            active: 0,
            healthy: 0,
            warning: 0,
            critical: 0,
            offline: 0,
            average_load: None,
        };

        let mut load_sum = 0.0;
        let mut load_count = 0usize;
        for record in &records {
            if record.active {
                summary.active += 1;
                if let Some(score) = record.load_score() {
                    load_sum += score;
                    load_count += 1;
                }
            }
            match self.health_status_of(record, now) {
                HealthStatus::Healthy => summary.healthy += 1,
                HealthStatus::Warning => summary.warning += 1,
                HealthStatus::Critical => summary.critical += 1,
                HealthStatus::Offline => summary.offline += 1,
            }
        }
        if load_count > 0 {
            summary.average_load = Some(load_sum / load_count as f64);
        }
        summary
    }
}

pub(crate) fn classify(
    record: &BranchRecord,
    now: Instant,
    offline_timeout: Duration,
    warning_load: f64,
    critical_load: f64,
) -> HealthStatus {
    if !record.active || record.heartbeat_age(now) > offline_timeout {
        return HealthStatus::Offline;
    }
    match record.load_score() {
        None => HealthStatus::Warning,
        Some(score) if score > critical_load => HealthStatus::Critical,
        Some(score) if score > warning_load => HealthStatus::Warning,
        Some(_) => HealthStatus::Healthy,
    }
}
