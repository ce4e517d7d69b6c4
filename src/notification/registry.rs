//! Subscriber id -> live callback handle.
//!
//! Every registration gets a fresh `handle_id`. Evictions triggered by a failed
//! push or probe go through [`CallbackRegistry::evict_if_match`], which only
//! removes the entry if it still holds the handle that failed; a concurrent
//! re-registration is never undone by a stale failure.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use tracing::info;

use super::Notifier;

/// A registered handle and the id it was registered under.
#[derive(Clone)]
pub struct CallbackEntry {
    pub handle_id: u64,
    pub notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for CallbackEntry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CallbackEntry")
            .field("handle_id", &self.handle_id)
            .finish()
    }
}

#[derive(Debug)]
pub struct CallbackRegistry {
    handles: DashMap<String, CallbackEntry>,
    next_handle: AtomicU64,
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            handles: DashMap::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Stores `notifier` for `subscriber_id`, replacing any previous handle.
    /// Returns the new handle id.
    pub fn register(
        &self,
        subscriber_id: &str,
        notifier: Arc<dyn Notifier>,
    ) -> u64 {
        let handle_id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .handles
            .insert(subscriber_id.to_string(), CallbackEntry { handle_id, notifier });
        match previous {
            Some(old) => info!(
                subscriber = %subscriber_id,
                handle_id,
                replaced = old.handle_id,
                "callback re-registered"
            ),
            None => info!(subscriber = %subscriber_id, handle_id, "callback registered"),
        }
        handle_id
    }

    /// Idempotent
    pub fn unregister(
        &self,
        subscriber_id: &str,
    ) -> bool {
        let removed = self.handles.remove(subscriber_id).is_some();
        if removed {
            info!(subscriber = %subscriber_id, "callback unregistered");
        }
        removed
    }

    pub fn get(
        &self,
        subscriber_id: &str,
    ) -> Option<CallbackEntry> {
        self.handles.get(subscriber_id).map(|e| e.value().clone())
    }

    /// Removes the entry only while it still holds `handle_id`.
    pub fn evict_if_match(
        &self,
        subscriber_id: &str,
        handle_id: u64,
    ) -> bool {
        let evicted = self
            .handles
            .remove_if(subscriber_id, |_, entry| entry.handle_id == handle_id)
            .is_some();
        if !evicted {
            debug!(subscriber = %subscriber_id, handle_id, "handle already replaced or removed");
        }
        evicted
    }

    /// Point-in-time copy of every registration
    pub fn entries(&self) -> Vec<(String, CallbackEntry)> {
        self.handles
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn is_registered(
        &self,
        subscriber_id: &str,
    ) -> bool {
        self.handles.contains_key(subscriber_id)
    }

    pub fn connected_count(&self) -> usize {
        self.handles.len()
    }
}
