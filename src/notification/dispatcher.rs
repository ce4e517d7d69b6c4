//! Persist-then-push delivery.
//!
//! `send` appends the record to the durable store before anything else. Only a
//! store failure is visible to the caller; the live push that follows is best
//! effort, bounded by `push_timeout`, and a failed push evicts the handle it
//! went through. There is no retry: the subscriber finds the record when it
//! next polls `list_recent`.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::timeout;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::CallbackRegistry;
use super::Directory;
use super::GroupSelector;
use super::NotificationRecord;
use super::Notifier;
use crate::metrics::CALLBACK_EVICTIONS;
use crate::metrics::NOTIFICATIONS_PERSISTED;
use crate::metrics::PERSISTENCE_FAILURES;
use crate::metrics::PUSH_FAILURES;
use crate::DeliveryError;
use crate::Error;
use crate::NotificationConfig;
use crate::PersistentStore;
use crate::Result;

pub(crate) const EVICTION_PUSH_FAILED: &str = "push_failed";

pub struct NotificationDispatcher {
    store: Arc<dyn PersistentStore>,
    directory: Arc<dyn Directory>,
    callbacks: Arc<CallbackRegistry>,
    push_timeout: Duration,
    config: NotificationConfig,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("connected", &self.callbacks.connected_count())
            .field("push_timeout", &self.push_timeout)
            .finish()
    }
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        directory: Arc<dyn Directory>,
        callbacks: Arc<CallbackRegistry>,
        config: &NotificationConfig,
    ) -> Self {
        Self {
            store,
            directory,
            callbacks,
            push_timeout: config.push_timeout(),
            config: config.clone(),
        }
    }

    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    /// Stores the handle, replacing any previous one, then sends the
    /// subscriber a "connected" notification through [`Self::send`].
    ///
    /// The handle stays registered even if persisting the greeting fails.
    pub async fn register_callback(
        &self,
        subscriber_id: &str,
        notifier: Arc<dyn Notifier>,
    ) -> Result<NotificationRecord> {
        ensure_subscriber_id(subscriber_id)?;
        self.callbacks.register(subscriber_id, notifier);
        self.send(subscriber_id, NotificationRecord::connected()).await
    }

    pub fn unregister_callback(
        &self,
        subscriber_id: &str,
    ) -> bool {
        self.callbacks.unregister(subscriber_id)
    }

    /// Persists `record` for `target_id`, then attempts a live push.
    ///
    /// Returns the stored record (with its assigned id).
    ///
    /// # Errors
    /// - `Error::Validation` for a blank target id
    /// - `Error::Storage` (or whatever the store reports) when the append
    ///   fails; no push is attempted for a record that was not stored
    pub async fn send(
        &self,
        target_id: &str,
        record: NotificationRecord,
    ) -> Result<NotificationRecord> {
        ensure_subscriber_id(target_id)?;

        let stored = match self.store.append_notification(record.addressed_to(target_id)) {
            Ok(stored) => stored,
            Err(e) => {
                PERSISTENCE_FAILURES.inc();
                error!(subscriber = %target_id, title = %record.title, "failed to persist notification: {:?}", e);
                return Err(e);
            }
        };
        NOTIFICATIONS_PERSISTED.inc();

        self.push(target_id, &stored).await;
        Ok(stored)
    }

    async fn push(
        &self,
        target_id: &str,
        record: &NotificationRecord,
    ) {
        let Some(entry) = self.callbacks.get(target_id) else {
            debug!(subscriber = %target_id, id = record.id, "no live callback, stored only");
            return;
        };

        let push = AssertUnwindSafe(timeout(self.push_timeout, entry.notifier.try_send(record)));
        let outcome = match push.catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DeliveryError::Timeout(self.push_timeout)),
            Err(_) => Err(DeliveryError::Rejected("push panicked".to_string())),
        };

        match outcome {
            Ok(()) => debug!(subscriber = %target_id, id = record.id, "notification pushed"),
            Err(e) => {
                PUSH_FAILURES.with_label_values(&[e.reason()]).inc();
                warn!(subscriber = %target_id, id = record.id, "push failed, evicting callback: {}", e);
                if self.callbacks.evict_if_match(target_id, entry.handle_id) {
                    CALLBACK_EVICTIONS
                        .with_label_values(&[EVICTION_PUSH_FAILED])
                        .inc();
                }
            }
        }
    }

    /// Sends `record` once to every subscriber `selector` resolves to.
    ///
    /// Failed sends are logged and skipped; the fan-out always runs to the end.
    /// Returns the records that were stored.
    ///
    /// # Errors
    /// Only a failure to resolve the selector itself.
    pub async fn send_to_group(
        &self,
        selector: &GroupSelector,
        record: NotificationRecord,
    ) -> Result<Vec<NotificationRecord>> {
        let targets = match selector {
            GroupSelector::Role(role) => self.directory.resolve_by_role(role)?,
            GroupSelector::Branch(branch) => self.directory.resolve_by_branch(branch)?,
            GroupSelector::Subscribers(ids) => ids.clone(),
        };

        let mut seen = HashSet::new();
        let mut stored = Vec::with_capacity(targets.len());
        for target in targets {
            if !seen.insert(target.clone()) {
                continue;
            }
            match self.send(&target, record.clone()).await {
                Ok(r) => stored.push(r),
                Err(e) => {
                    warn!(subscriber = %target, selector = ?selector, "group send skipped target: {:?}", e);
                }
            }
        }
        debug!(selector = ?selector, stored = stored.len(), "group send finished");
        Ok(stored)
    }

    /// Newest first; `limit` is clamped to the configured bounds.
    pub fn list_recent(
        &self,
        subscriber_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>> {
        ensure_subscriber_id(subscriber_id)?;
        self.store
            .list_by_subscriber(subscriber_id, self.config.clamp_limit(limit))
    }

    /// Returns how many of `ids` flipped from unread to read.
    pub fn mark_read(
        &self,
        subscriber_id: &str,
        ids: &[u64],
    ) -> Result<usize> {
        ensure_subscriber_id(subscriber_id)?;
        if ids.is_empty() {
            return Ok(0);
        }
        self.store.mark_read(subscriber_id, ids)
    }

    pub fn unread_count(
        &self,
        subscriber_id: &str,
    ) -> Result<usize> {
        ensure_subscriber_id(subscriber_id)?;
        self.store.count_unread(subscriber_id)
    }
}

fn ensure_subscriber_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::Validation("subscriber id cannot be empty".into()));
    }
    Ok(())
}
