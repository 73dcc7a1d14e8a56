//! The task scheduling boundary: spawning, the current-task handle, and
//! structured termination.
//!
//! Tasks are tokio tasks with an observable lifecycle bolted on: every task
//! spawned here records a [`TaskOutcome`] when it ends, can be looked up
//! from inside itself with [`current`], and can be terminated from outside
//! with a structured error rather than a bare abort. Links
//! ([`crate::link_failure`]) are built entirely out of this surface.

mod model;
pub use model::*;
