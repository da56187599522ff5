// src/watch/mod.rs

//! Directory watching and path mapping.
//!
//! This module is responsible for:
//! - Mapping changed source paths to deployment paths ([`mapper`]).
//! - Registering every directory of a project tree for change notifications
//!   and remembering what each registration means ([`registrar`],
//!   [`registry`]).
//! - Turning `notify` events into per-directory batches ([`backend`]).
//!
//! It does **not** copy anything; applying changes is the job of
//! [`crate::engine`].

pub mod backend;
pub mod event;
pub mod mapper;
pub mod path_utils;
pub mod patterns;
pub mod registrar;
pub mod registry;

pub use backend::{NotifyBackend, WatchBackend};
pub use event::{ChangeEvent, ChangeKind, WatchBatch, WorkerMessage};
pub use mapper::map_to_target;
pub use patterns::IgnoreSet;
pub use registrar::{
    claim_registered_subtree, register_tree, RegistrationMode, RegistrationRequest, WatchOwner,
};
pub use registry::{WatchHandle, WatchRegistry, WatchedDirectory};
