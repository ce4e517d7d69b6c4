use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::composite_key;
use super::PersistentStore;
use crate::utils::time::current_day;
use crate::utils::time::timestamp_millis;
use crate::Directory;
use crate::NotificationRecord;
use crate::Result;
use crate::StockLookup;
use crate::StorageError;
use crate::SubscriberProfile;

/// Sled database tree namespaces
const NOTIFICATIONS_TREE: &str = "notifications";
const ORDER_COUNTERS_TREE: &str = "order_counters";
const STOCK_TREE: &str = "stock";
const SUBSCRIBERS_TREE: &str = "subscribers";

/// sled backed [`PersistentStore`].
///
/// Notification keys are `subscriber 0x00 id(be)`, so a prefix scan walks one
/// subscriber's history in id order and ids allocated by
/// [`sled::Db::generate_id`] keep growing across restarts.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
    notifications: sled::Tree,
    order_counters: sled::Tree,
    stock: sled::Tree,
    subscribers: sled::Tree,
}

impl std::fmt::Debug for SledStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("notifications", &self.notifications.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl SledStore {
    /// Opens (or creates) the database under `path`.
    pub fn open(path: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        debug!("open sled store from path: {:?}", &path);

        let db = sled::Config::default()
            .path(path.as_ref())
            .cache_capacity(64 * 1024 * 1024) //64MB
            .flush_every_ms(Some(10))
            .use_compression(true)
            .compression_factor(1)
            .open()
            .map_err(|e| {
                warn!("Try to open DB at this location: {:?} and failed: {:?}", path, e);
                e
            })?;
        Self::from_db(Arc::new(db))
    }

    pub fn from_db(db: Arc<sled::Db>) -> Result<Self> {
        Ok(Self {
            notifications: db.open_tree(NOTIFICATIONS_TREE)?,
            order_counters: db.open_tree(ORDER_COUNTERS_TREE)?,
            stock: db.open_tree(STOCK_TREE)?,
            subscribers: db.open_tree(SUBSCRIBERS_TREE)?,
            db,
        })
    }

    /// Increments today's order counter of `branch`; returns the new value.
    pub fn record_order(
        &self,
        branch: &str,
    ) -> Result<u64> {
        let key = composite_key(branch, &current_day().to_be_bytes());
        let updated = self.order_counters.update_and_fetch(key, |old| {
            let next = old
                .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
                .map(u64::from_be_bytes)
                .unwrap_or(0)
                + 1;
            Some(next.to_be_bytes().to_vec())
        })?;
        match updated {
            Some(bytes) => decode_u64(branch, &bytes),
            None => Ok(0),
        }
    }

    pub fn set_stock(
        &self,
        branch: &str,
        item_id: &str,
        quantity: u64,
    ) -> Result<()> {
        self.stock
            .insert(composite_key(branch, item_id.as_bytes()), &quantity.to_be_bytes())?;
        Ok(())
    }

    pub fn upsert_subscriber(
        &self,
        subscriber_id: &str,
        profile: &SubscriberProfile,
    ) -> Result<()> {
        self.subscribers
            .insert(subscriber_id.as_bytes(), bincode::serialize(profile)?)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }

    fn subscribers_where(
        &self,
        predicate: impl Fn(&SubscriberProfile) -> bool,
    ) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for item in self.subscribers.iter() {
            let (key, value) = item?;
            let profile: SubscriberProfile = bincode::deserialize(&value)?;
            if predicate(&profile) {
                ids.push(String::from_utf8_lossy(&key).into_owned());
            }
        }
        Ok(ids)
    }
}

impl PersistentStore for SledStore {
    fn append_notification(
        &self,
        mut record: NotificationRecord,
    ) -> Result<NotificationRecord> {
        record.id = self.db.generate_id()?;
        record.created_at = timestamp_millis();
        record.read = false;

        let key = composite_key(&record.target_id, &record.id.to_be_bytes());
        self.notifications.insert(key, bincode::serialize(&record)?)?;
        Ok(record)
    }

    fn list_by_subscriber(
        &self,
        subscriber_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>> {
        let prefix = composite_key(subscriber_id, &[]);
        let mut records = Vec::with_capacity(limit.min(128));
        for item in self.notifications.scan_prefix(prefix).rev().take(limit) {
            let (_, value) = item?;
            records.push(bincode::deserialize(&value)?);
        }
        Ok(records)
    }

    fn mark_read(
        &self,
        subscriber_id: &str,
        ids: &[u64],
    ) -> Result<usize> {
        let mut changed = 0;
        for id in ids {
            let key = composite_key(subscriber_id, &id.to_be_bytes());
            // compare-and-swap so concurrent callers count each flip once
            let mut current = self.notifications.get(&key)?;
            while let Some(value) = current {
                let mut record: NotificationRecord = bincode::deserialize(&value)?;
                if record.read {
                    break;
                }
                record.read = true;
                let swapped = self.notifications.compare_and_swap(
                    &key,
                    Some(&value),
                    Some(bincode::serialize(&record)?),
                )?;
                match swapped {
                    Ok(()) => {
                        changed += 1;
                        break;
                    }
                    Err(conflict) => current = conflict.current,
                }
            }
        }
        Ok(changed)
    }

    fn count_unread(
        &self,
        subscriber_id: &str,
    ) -> Result<usize> {
        let prefix = composite_key(subscriber_id, &[]);
        let mut unread = 0;
        for item in self.notifications.scan_prefix(prefix) {
            let (_, value) = item?;
            let record: NotificationRecord = bincode::deserialize(&value)?;
            if !record.read {
                unread += 1;
            }
        }
        Ok(unread)
    }

    fn orders_today(
        &self,
        branch: &str,
    ) -> Result<u64> {
        let key = composite_key(branch, &current_day().to_be_bytes());
        match self.order_counters.get(key)? {
            Some(bytes) => decode_u64(branch, &bytes),
            None => Ok(0),
        }
    }

    fn stock_item_count(
        &self,
        branch: &str,
    ) -> Result<u64> {
        let mut total = 0u64;
        for item in self.stock.scan_prefix(composite_key(branch, &[])) {
            let (_, value) = item?;
            total = total.saturating_add(decode_u64(branch, &value)?);
        }
        Ok(total)
    }
}

impl StockLookup for SledStore {
    fn has_quantity(
        &self,
        branch: &str,
        item_id: &str,
        quantity: u64,
    ) -> Result<bool> {
        match self.stock.get(composite_key(branch, item_id.as_bytes()))? {
            Some(bytes) => Ok(decode_u64(branch, &bytes)? >= quantity),
            None => Ok(false),
        }
    }
}

impl Directory for SledStore {
    fn resolve_by_role(
        &self,
        role: &str,
    ) -> Result<Vec<String>> {
        self.subscribers_where(|profile| profile.role == role)
    }

    fn resolve_by_branch(
        &self,
        branch: &str,
    ) -> Result<Vec<String>> {
        self.subscribers_where(|profile| profile.branch.as_deref() == Some(branch))
    }
}

fn decode_u64(
    key: &str,
    bytes: &[u8],
) -> Result<u64> {
    let array: [u8; 8] = bytes.try_into().map_err(|_| StorageError::Corrupted {
        key: key.to_string(),
        reason: format!("expected 8 bytes, found {}", bytes.len()),
    })?;
    Ok(u64::from_be_bytes(array))
}
