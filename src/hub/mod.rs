//! The coordination hub: one explicitly constructed context owning every
//! registry and background worker.
mod builder;
#[allow(clippy::module_inception)]
mod hub;

pub use builder::*;
pub use hub::*;

#[cfg(test)]
mod builder_test;
