//! Authoritative in-memory table of branches.
//!
//! Each entry is mutated atomically under its DashMap shard lock; readers that
//! need to iterate (selection, sweeps, reporting) work on [`BranchRegistry::snapshot_all`]
//! copies and never on the live table. No method blocks on I/O.

use dashmap::DashMap;
use tokio::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::trace;

use super::BranchRecord;
use super::LoadStats;
use crate::metrics::ACTIVE_BRANCHES;
use crate::Error;
use crate::Result;

#[derive(Debug, Default)]
pub struct BranchRegistry {
    branches: DashMap<String, BranchRecord>,
}

impl BranchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts `record` by name, marks it active and stamps the heartbeat.
    ///
    /// # Errors
    /// `Error::Validation` when the name is blank; the table is left untouched.
    pub fn register(
        &self,
        mut record: BranchRecord,
    ) -> Result<()> {
        if record.name.trim().is_empty() {
            return Err(Error::Validation("branch name cannot be empty".into()));
        }

        record.active = true;
        record.last_heartbeat_at = Instant::now();

        info!(branch = %record.name, address = %record.address(), "branch registered");
        self.branches.insert(record.name.clone(), record);
        self.refresh_active_gauge();
        Ok(())
    }

    /// Removes the branch if present
    pub fn unregister(
        &self,
        name: &str,
    ) -> bool {
        let removed = self.branches.remove(name).is_some();
        if removed {
            info!(branch = %name, "branch unregistered");
            self.refresh_active_gauge();
        }
        removed
    }

    /// Stamps the heartbeat and reactivates the branch.
    ///
    /// Unknown names are ignored: a heartbeat racing with unregister must not
    /// resurrect the branch.
    pub fn heartbeat(
        &self,
        name: &str,
    ) -> bool {
        let reactivated = match self.branches.get_mut(name) {
            Some(mut record) => {
                record.last_heartbeat_at = Instant::now();
                let was_active = record.active;
                record.active = true;
                trace!(branch = %name, "heartbeat");
                !was_active
            }
            None => {
                debug!(branch = %name, "heartbeat from unknown branch ignored");
                return false;
            }
        };

        if reactivated {
            info!(branch = %name, "branch back online");
            self.refresh_active_gauge();
        }
        true
    }

    /// Replaces the stats of a known branch; unknown names are ignored.
    pub fn update_stats(
        &self,
        name: &str,
        stats: LoadStats,
    ) -> bool {
        match self.branches.get_mut(name) {
            Some(mut record) => {
                record.stats = Some(stats);
                true
            }
            None => false,
        }
    }

    /// Derives new stats from the current ones under the entry lock.
    ///
    /// Returns the stored stats, or `None` when the branch is unknown.
    pub fn merge_stats<F>(
        &self,
        name: &str,
        merge: F,
    ) -> Option<LoadStats>
    where
        F: FnOnce(Option<&LoadStats>) -> LoadStats,
    {
        let mut record = self.branches.get_mut(name)?;
        let stats = merge(record.stats.as_ref());
        record.stats = Some(stats);
        Some(stats)
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<BranchRecord> {
        self.branches.get(name).map(|r| r.value().clone())
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.branches.contains_key(name)
    }

    /// Point-in-time copy of every record, sorted by name.
    pub fn snapshot_all(&self) -> Vec<BranchRecord> {
        let mut records: Vec<BranchRecord> =
            self.branches.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Active records only, sorted by name.
    pub fn snapshot_active(&self) -> Vec<BranchRecord> {
        self.snapshot_all().into_iter().filter(|r| r.active).collect()
    }

    /// Marks every active branch whose heartbeat is older than `timeout` as
    /// inactive. Returns the names that transitioned, sorted.
    ///
    /// Idempotent: branches already inactive are not reported again.
    pub fn mark_stale_inactive(
        &self,
        now: Instant,
        timeout: Duration,
    ) -> Vec<String> {
        let mut newly_offline = Vec::new();
        for mut entry in self.branches.iter_mut() {
            let record = entry.value_mut();
            if record.active && record.heartbeat_age(now) > timeout {
                record.active = false;
                newly_offline.push(record.name.clone());
            }
        }

        if !newly_offline.is_empty() {
            newly_offline.sort();
            self.refresh_active_gauge();
        }
        newly_offline
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.branches.iter().filter(|entry| entry.active).count()
    }

    fn refresh_active_gauge(&self) {
        ACTIVE_BRANCHES.set(self.active_count() as i64);
    }
}
