// src/deps/mod.rs

//! Third-party library materialization bookkeeping.
//!
//! - [`marker`]: the persisted timestamp of the last successful run.
//! - [`scheduler`]: the due-check, invalidation and run policy built on it.

pub mod marker;
pub mod scheduler;

pub use marker::MarkerStore;
pub use scheduler::{DependencyCopyScheduler, MaterializationOutcome};
