use std::collections::BTreeMap;
use std::collections::HashMap;

use parking_lot::RwLock;

use super::PersistentStore;
use crate::utils::time::current_day;
use crate::utils::time::timestamp_millis;
use crate::Directory;
use crate::NotificationRecord;
use crate::Result;
use crate::StockLookup;
use crate::SubscriberProfile;

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    /// subscriber -> id -> record
    notifications: HashMap<String, BTreeMap<u64, NotificationRecord>>,
    /// (branch, day) -> orders
    order_counters: HashMap<(String, u64), u64>,
    /// branch -> item -> quantity
    stock: HashMap<String, BTreeMap<String, u64>>,
    subscribers: BTreeMap<String, SubscriberProfile>,
}

/// In-memory [`PersistentStore`]; contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemStore {
    tables: RwLock<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_order(
        &self,
        branch: &str,
    ) -> Result<u64> {
        let mut tables = self.tables.write();
        let counter = tables
            .order_counters
            .entry((branch.to_string(), current_day()))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    pub fn set_stock(
        &self,
        branch: &str,
        item_id: &str,
        quantity: u64,
    ) -> Result<()> {
        self.tables
            .write()
            .stock
            .entry(branch.to_string())
            .or_default()
            .insert(item_id.to_string(), quantity);
        Ok(())
    }

    pub fn upsert_subscriber(
        &self,
        subscriber_id: &str,
        profile: &SubscriberProfile,
    ) -> Result<()> {
        self.tables
            .write()
            .subscribers
            .insert(subscriber_id.to_string(), profile.clone());
        Ok(())
    }

    fn subscribers_where(
        &self,
        predicate: impl Fn(&SubscriberProfile) -> bool,
    ) -> Vec<String> {
        self.tables
            .read()
            .subscribers
            .iter()
            .filter(|(_, profile)| predicate(profile))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl PersistentStore for MemStore {
    fn append_notification(
        &self,
        mut record: NotificationRecord,
    ) -> Result<NotificationRecord> {
        let mut tables = self.tables.write();
        tables.next_id += 1;
        record.id = tables.next_id;
        record.created_at = timestamp_millis();
        record.read = false;

        tables
            .notifications
            .entry(record.target_id.clone())
            .or_default()
            .insert(record.id, record.clone());
        Ok(record)
    }

    fn list_by_subscriber(
        &self,
        subscriber_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .notifications
            .get(subscriber_id)
            .map(|records| records.values().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn mark_read(
        &self,
        subscriber_id: &str,
        ids: &[u64],
    ) -> Result<usize> {
        let mut tables = self.tables.write();
        let Some(records) = tables.notifications.get_mut(subscriber_id) else {
            return Ok(0);
        };
        let mut changed = 0;
        for id in ids {
            if let Some(record) = records.get_mut(id) {
                if !record.read {
                    record.read = true;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    fn count_unread(
        &self,
        subscriber_id: &str,
    ) -> Result<usize> {
        let tables = self.tables.read();
        Ok(tables
            .notifications
            .get(subscriber_id)
            .map(|records| records.values().filter(|r| !r.read).count())
            .unwrap_or(0))
    }

    fn orders_today(
        &self,
        branch: &str,
    ) -> Result<u64> {
        let tables = self.tables.read();
        Ok(tables
            .order_counters
            .get(&(branch.to_string(), current_day()))
            .copied()
            .unwrap_or(0))
    }

    fn stock_item_count(
        &self,
        branch: &str,
    ) -> Result<u64> {
        let tables = self.tables.read();
        Ok(tables
            .stock
            .get(branch)
            .map(|items| items.values().fold(0u64, |acc, q| acc.saturating_add(*q)))
            .unwrap_or(0))
    }
}

impl StockLookup for MemStore {
    fn has_quantity(
        &self,
        branch: &str,
        item_id: &str,
        quantity: u64,
    ) -> Result<bool> {
        let tables = self.tables.read();
        Ok(tables
            .stock
            .get(branch)
            .and_then(|items| items.get(item_id))
            .is_some_and(|available| *available >= quantity))
    }
}

impl Directory for MemStore {
    fn resolve_by_role(
        &self,
        role: &str,
    ) -> Result<Vec<String>> {
        Ok(self.subscribers_where(|profile| profile.role == role))
    }

    fn resolve_by_branch(
        &self,
        branch: &str,
    ) -> Result<Vec<String>> {
        Ok(self.subscribers_where(|profile| profile.branch.as_deref() == Some(branch)))
    }
}
