//! Central coordination hub for distributed retail branches.
//!
//! - liveness tracking of branch processes (register / heartbeat / sweeps)
//! - load-aware and round-robin routing to the best branch
//! - persist-then-push notifications to live subscribers
//!
//! Everything hangs off one [`Hub`] built by [`HubBuilder`].

mod branch;
mod config;
mod errors;
mod hub;
pub mod metrics;
mod notification;
mod storage;
pub mod utils;

pub use branch::*;
pub use config::*;
pub use errors::*;
pub use hub::*;
pub use notification::*;
pub use storage::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;

//-----------------------------------------------------------
// Autometrics
/// autometrics: https://docs.autometrics.dev/rust/adding-alerts-and-slos
use autometrics::objectives::Objective;
use autometrics::objectives::ObjectiveLatency;
use autometrics::objectives::ObjectivePercentile;
const API_SLO: Objective = Objective::new("api")
    .success_rate(ObjectivePercentile::P99_9)
    .latency(ObjectiveLatency::Ms10, ObjectivePercentile::P99);
