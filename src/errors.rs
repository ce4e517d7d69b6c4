//! Branch Hub Error Hierarchy
//!
//! Caller-visible failures are modelled by [`Error`]. Push failures towards
//! subscribers live in [`DeliveryError`]; they are logged and counted but never
//! propagated out of a `send`.

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Null/blank required argument. Raised before any state change.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Durable store failures (notifications, counters, stock)
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Signal sender closed: {0}")]
    SignalSenderClosed(String),

    /// Background worker could not be joined
    #[error(transparent)]
    TaskJoin(#[from] JoinError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Embedded database errors
    #[error("Database error: {0}")]
    Db(#[from] sled::Error),

    /// Record (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Stored bytes do not match the expected layout
    #[error("Corrupted entry under key {key}: {reason}")]
    Corrupted { key: String, reason: String },

    /// Filesystem failures around the data directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Best-effort push failure towards one subscriber.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeliveryError {
    /// The subscriber's channel is gone
    #[error("Subscriber disconnected")]
    Disconnected,

    /// The subscriber is not draining its channel
    #[error("Subscriber buffer full")]
    Full,

    /// The transport refused the event
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    /// Push or probe did not complete in time
    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),
}

impl DeliveryError {
    /// Short label used for metrics
    pub(crate) fn reason(&self) -> &'static str {
        match self {
            DeliveryError::Disconnected => "disconnected",
            DeliveryError::Full => "full",
            DeliveryError::Rejected(_) => "rejected",
            DeliveryError::Timeout(_) => "timeout",
        }
    }
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Error::Storage(StorageError::Db(e))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Storage(StorageError::Serialization(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(StorageError::Io(e))
    }
}
