// src/engine/mod.rs

//! Synchronization engine.
//!
//! This module ties together:
//! - project planning (descriptor, deployment root, dependency projects),
//! - the initial watch registration,
//! - library materialization at startup and after descriptor changes,
//! - the dispatch worker that applies change batches.
//!
//! The event semantics live in [`dispatch`], which is synchronous and can be
//! unit tested against a mock filesystem; [`worker`] is the thread shell
//! around it and [`lifecycle`] wires everything up.

pub mod dispatch;
pub mod lifecycle;
pub mod worker;

pub use crate::types::EngineState;
pub use dispatch::{DispatchEffect, DispatchTarget, Dispatcher, SkipReason};
pub use lifecycle::{plan_project, scheduler_for, Collaborators, Engine, EngineSettings, ProjectPlan};
pub use worker::{run_worker, spawn_worker};
