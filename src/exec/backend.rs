// src/exec/backend.rs

//! Pluggable library materialization.
//!
//! The scheduler talks to a `Materializer` instead of spawning processes
//! itself, so tests can swap in a fake that records requests.
//!
//! - [`CommandMaterializer`](super::command::CommandMaterializer) is the
//!   production implementation: it runs a configured shell command.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use anyhow::Result;

/// Inputs of one materialization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializationRequest {
    /// Source root of the managed project whose libraries are resolved.
    pub project_root: PathBuf,
    /// Directory the resolved library files are written to.
    pub output_dir: PathBuf,
}

/// Resolves third-party libraries of a project into a directory.
pub trait Materializer: Send + Sync {
    /// Run one materialization. `Err` means the output directory must be
    /// considered stale.
    fn materialize<'a>(
        &'a self,
        request: &'a MaterializationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
