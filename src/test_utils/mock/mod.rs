use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::DeliveryError;
use crate::NotificationRecord;
use crate::Notifier;

/// Never completes a push or a probe within any realistic timeout.
#[derive(Debug, Default)]
pub(crate) struct StalledNotifier;

#[async_trait]
impl Notifier for StalledNotifier {
    async fn try_send(
        &self,
        _record: &NotificationRecord,
    ) -> Result<(), DeliveryError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn probe_alive(&self) -> Result<bool, DeliveryError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(true)
    }
}

/// Accepts every push and counts them; probes answer with `alive`.
#[derive(Debug, Clone)]
pub(crate) struct CountingNotifier {
    pub(crate) pushes: Arc<AtomicUsize>,
    pub(crate) alive: bool,
}

impl CountingNotifier {
    pub(crate) fn new(alive: bool) -> Self {
        Self {
            pushes: Arc::new(AtomicUsize::new(0)),
            alive,
        }
    }

    pub(crate) fn pushes(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn try_send(
        &self,
        _record: &NotificationRecord,
    ) -> Result<(), DeliveryError> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn probe_alive(&self) -> Result<bool, DeliveryError> {
        Ok(self.alive)
    }
}

/// Panics on every push and every probe.
#[derive(Debug, Default)]
pub(crate) struct PanickingNotifier;

#[async_trait]
impl Notifier for PanickingNotifier {
    async fn try_send(
        &self,
        _record: &NotificationRecord,
    ) -> Result<(), DeliveryError> {
        panic!("remote stub threw on push")
    }

    async fn probe_alive(&self) -> Result<bool, DeliveryError> {
        panic!("remote stub threw on probe")
    }
}
