use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::DeliveryError;
use crate::NotificationRecord;

/// Live channel towards one subscriber.
///
/// Transport details (sockets, RPC stubs, in-process queues) stay behind this
/// trait; the registry and dispatcher only see push and probe outcomes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Pushes one event. Any error means the subscriber is considered gone.
    async fn try_send(
        &self,
        record: &NotificationRecord,
    ) -> Result<(), DeliveryError>;

    /// `Ok(false)` and `Err(_)` both mean the handle is dead.
    async fn probe_alive(&self) -> Result<bool, DeliveryError>;
}

/// In-process [`Notifier`] over a bounded tokio channel.
///
/// A full buffer is reported as [`DeliveryError::Full`]: the subscriber is not
/// draining and gets evicted like a disconnected one.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<NotificationRecord>,
}

impl ChannelNotifier {
    /// Returns the notifier and the subscriber's receiving end.
    pub fn pair(buffer: usize) -> (Self, mpsc::Receiver<NotificationRecord>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn try_send(
        &self,
        record: &NotificationRecord,
    ) -> Result<(), DeliveryError> {
        self.sender.try_send(record.clone()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }

    async fn probe_alive(&self) -> Result<bool, DeliveryError> {
        Ok(!self.sender.is_closed())
    }
}
