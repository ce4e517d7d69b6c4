//! Persist-then-push notification delivery.
//!
//! - [`CallbackRegistry`]: subscriber id -> live [`Notifier`] handle
//! - [`NotificationDispatcher`]: durable append, then best-effort push
//! - [`CallbackJanitor`]: periodic liveness probes evicting dead handles

mod dispatcher;
mod janitor;
mod notifier;
mod record;
mod registry;

pub use dispatcher::*;
pub use janitor::*;
pub use notifier::*;
pub use record::*;
pub use registry::*;


#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Targets of a group send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSelector {
    /// Every subscriber holding the role
    Role(String),
    /// Every subscriber attached to the branch
    Branch(String),
    /// Explicit ids, used as given
    Subscribers(Vec<String>),
}

/// Directory entry of a notification subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberProfile {
    pub role: String,
    pub branch: Option<String>,
}

impl SubscriberProfile {
    pub fn new(
        role: impl Into<String>,
        branch: Option<&str>,
    ) -> Self {
        Self {
            role: role.into(),
            branch: branch.map(str::to_string),
        }
    }
}

/// Resolves group selectors to subscriber ids.
#[cfg_attr(test, automock)]
pub trait Directory: Send + Sync + 'static {
    fn resolve_by_role(
        &self,
        role: &str,
    ) -> Result<Vec<String>>;

    fn resolve_by_branch(
        &self,
        branch: &str,
    ) -> Result<Vec<String>>;
}
