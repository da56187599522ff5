// src/exec/mod.rs

//! External library materialization.
//!
//! This module:
//! - defines the [`Materializer`] seam and its request type,
//! - runs the configured shell command ([`command`]),
//! - debounces descriptor-change requests ([`materialize_loop`]).
//!
//! Whether a run is due at all is decided by [`crate::deps`].

pub mod backend;
pub mod command;
pub mod materialize_loop;

pub use backend::{MaterializationRequest, Materializer};
pub use command::CommandMaterializer;
pub use materialize_loop::{spawn_materialize_loop, MaterializeLoop, MaterializeTrigger};
