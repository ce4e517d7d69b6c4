//! Durable store collaborators.
//!
//! [`PersistentStore`] is the seam the dispatcher and the stats refresher write
//! through. Two adaptors are provided:
//! - [`SledStore`]: embedded sled database, one tree per concern
//! - [`MemStore`]: process-local tables for tests and ephemeral hubs
//!
//! Both adaptors also answer [`crate::StockLookup`] and [`crate::Directory`]
//! queries from the same data.

mod mem_store;
mod sled_store;

pub use mem_store::*;
pub use sled_store::*;

#[cfg(test)]
mod sled_store_test;

#[cfg(test)]
use mockall::automock;

use crate::NotificationRecord;
use crate::Result;

#[cfg_attr(test, automock)]
pub trait PersistentStore: Send + Sync + 'static {
    /// Appends `record`, assigning a fresh id and `created_at`.
    /// Returns the stored copy.
    fn append_notification(
        &self,
        record: NotificationRecord,
    ) -> Result<NotificationRecord>;

    /// Newest first, at most `limit` records
    fn list_by_subscriber(
        &self,
        subscriber_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>>;

    /// Flags the listed ids as read. Ids that are unknown or owned by another
    /// subscriber are skipped. Returns how many records changed state.
    fn mark_read(
        &self,
        subscriber_id: &str,
        ids: &[u64],
    ) -> Result<usize>;

    fn count_unread(
        &self,
        subscriber_id: &str,
    ) -> Result<usize>;

    /// Orders processed by `branch` since midnight (UTC)
    fn orders_today(
        &self,
        branch: &str,
    ) -> Result<u64>;

    /// Units on hand across every item of `branch`
    fn stock_item_count(
        &self,
        branch: &str,
    ) -> Result<u64>;
}

/// `a 0x00 b`; names never contain NUL so prefixes are unambiguous
pub(crate) fn composite_key(
    a: &str,
    b: &[u8],
) -> Vec<u8> {
    let mut key = Vec::with_capacity(a.len() + 1 + b.len());
    key.extend_from_slice(a.as_bytes());
    key.push(0);
    key.extend_from_slice(b);
    key
}
