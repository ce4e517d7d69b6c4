use std::fmt;

use serde::Deserialize;
use serde::Serialize;

pub(crate) const CONNECTED_TITLE: &str = "Connected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Info,
    Order,
    Stock,
    Branch,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

/// One persisted notification.
///
/// `id` and `created_at` are assigned by the store on append; every other field
/// except `read` is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: u64,
    pub target_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub read: bool,
    /// Unix millis
    pub created_at: u64,
    pub action_url: Option<String>,
    pub metadata: Option<String>,
}

impl NotificationRecord {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            id: 0,
            target_id: String::new(),
            title: title.into(),
            message: message.into(),
            kind,
            priority: Priority::Normal,
            read: false,
            created_at: 0,
            action_url: None,
            metadata: None,
        }
    }

    pub fn with_priority(
        mut self,
        priority: Priority,
    ) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_action_url(
        mut self,
        url: impl Into<String>,
    ) -> Self {
        self.action_url = Some(url.into());
        self
    }

    pub fn with_metadata(
        mut self,
        metadata: impl Into<String>,
    ) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Greeting pushed right after a callback registers
    pub fn connected() -> Self {
        Self::new(
            CONNECTED_TITLE,
            "Live notifications enabled",
            NotificationKind::System,
        )
        .with_priority(Priority::Low)
    }

    /// Copy addressed to `target_id`, with store-assigned fields cleared.
    pub(crate) fn addressed_to(
        &self,
        target_id: &str,
    ) -> Self {
        Self {
            id: 0,
            target_id: target_id.to_string(),
            read: false,
            created_at: 0,
            ..self.clone()
        }
    }
}

impl fmt::Display for NotificationRecord {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "#{} [{:?}/{:?}] {}", self.id, self.kind, self.priority, self.title)
    }
}
