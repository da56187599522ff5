// src/watch/registrar.rs

//! Recursive watch registration.
//!
//! A tree is walked with an explicit work-list. Every directory is registered
//! with the backend and recorded in the registry before its children are
//! visited.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::project::ProjectDescriptor;
use crate::watch::backend::WatchBackend;
use crate::watch::registry::{WatchRegistry, WatchedDirectory};

/// How registration failures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMode {
    /// Startup walk of a project: the first failure is returned.
    Initial,
    /// Directories discovered later: failures are logged and the affected
    /// directory stays unwatched.
    Dynamic,
}

/// Who a registered directory belongs to.
#[derive(Debug, Clone)]
pub struct WatchOwner {
    pub source_root: PathBuf,
    pub deployment: String,
    pub is_dependency_project: bool,
    pub descriptor: Option<Arc<ProjectDescriptor>>,
}

impl WatchOwner {
    fn watched(&self, path: PathBuf) -> WatchedDirectory {
        WatchedDirectory {
            path,
            source_root: self.source_root.clone(),
            deployment: self.deployment.clone(),
            is_dependency_project: self.is_dependency_project,
            descriptor: self.descriptor.clone(),
        }
    }
}

/// A pending request to watch the tree under `root`.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub root: PathBuf,
    pub owner: WatchOwner,
}

/// Register every directory under `request.root` (inclusive).
///
/// Directories already present in the registry are skipped together with
/// their subtrees. Returns the newly registered directories in visiting order.
pub fn register_tree(
    fs: &dyn FileSystem,
    backend: &mut dyn WatchBackend,
    registry: &mut WatchRegistry,
    request: &RegistrationRequest,
    mode: RegistrationMode,
) -> Result<Vec<PathBuf>> {
    if !fs.is_dir(&request.root) {
        let err = anyhow!("not a directory: {:?}", request.root);
        return match mode {
            RegistrationMode::Initial => Err(err),
            RegistrationMode::Dynamic => {
                warn!(dir = ?request.root, "directory vanished before it could be watched");
                Ok(Vec::new())
            }
        };
    }

    let mut registered = Vec::new();
    let mut work_list: Vec<PathBuf> = vec![request.root.clone()];

    while let Some(dir) = work_list.pop() {
        if registry.contains_dir(&dir) {
            continue;
        }

        match backend.register(&dir) {
            Ok(handle) => {
                registry.insert(handle, request.owner.watched(dir.clone()));
                registered.push(dir.clone());
            }
            Err(err) => {
                tolerate(mode, &dir, err.context("registering directory watch"))?;
                continue;
            }
        }

        match fs.read_dir(&dir) {
            Ok(entries) => {
                // Reverse so the sorted listing is visited in order.
                work_list.extend(entries.into_iter().rev().filter(|p| fs.is_dir(p)));
            }
            Err(err) => {
                tolerate(mode, &dir, err.context("listing directory"))?;
            }
        }
    }

    debug!(
        root = ?request.root,
        count = registered.len(),
        dependency = request.owner.is_dependency_project,
        "registered directory watches"
    );
    Ok(registered)
}

/// Hand already registered directories under `request.root` over to
/// `request.owner`.
///
/// `register_tree` skips directories the registry knows, so a project nested
/// inside another project's tree would otherwise keep the outer owner.
/// Returns how many entries changed hands.
pub fn claim_registered_subtree(registry: &mut WatchRegistry, request: &RegistrationRequest) -> usize {
    registry.update_tree(&request.root, |dir| {
        *dir = request.owner.watched(std::mem::take(&mut dir.path));
    })
}

fn tolerate(mode: RegistrationMode, dir: &Path, err: anyhow::Error) -> Result<()> {
    match mode {
        RegistrationMode::Initial => Err(err).with_context(|| format!("watching tree at {:?}", dir)),
        RegistrationMode::Dynamic => {
            warn!(dir = ?dir, error = %format!("{err:#}"), "directory left unwatched");
            Ok(())
        }
    }
}
