use std::sync::Arc;

use crate::CallbackRegistry;
use crate::MemStore;
use crate::NotificationConfig;
use crate::NotificationDispatcher;
use crate::NotificationKind;
use crate::NotificationRecord;

/// Dispatcher over a fresh [`MemStore`] that also acts as the directory.
pub(crate) fn mem_dispatcher(
    config: &NotificationConfig
) -> (Arc<MemStore>, Arc<CallbackRegistry>, NotificationDispatcher) {
    let store = Arc::new(MemStore::new());
    let callbacks = Arc::new(CallbackRegistry::new());
    let dispatcher =
        NotificationDispatcher::new(store.clone(), store.clone(), callbacks.clone(), config);
    (store, callbacks, dispatcher)
}

pub(crate) fn order_event(title: &str) -> NotificationRecord {
    NotificationRecord::new(title, "order state changed", NotificationKind::Order)
}
