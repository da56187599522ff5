// src/engine/dispatch.rs

//! Applying change batches to the deployment tree.
//!
//! [`Dispatcher`] owns the watch registry and performs every filesystem
//! effect synchronously, in arrival order. It has no channels and no threads;
//! the worker in [`super::worker`] feeds it batches.
//!
//! Per event:
//! 1. resolve the watched directory and the absolute changed path;
//! 2. drop `Modified` on directories and on paths that no longer exist;
//! 3. map the path (unmapped or ignored paths get no deployment effects);
//! 4. created/modified: mkdir target (directories) or copy (files);
//!    deleted: remove the target;
//! 5. changes in dependency projects mark library materialization due.
//!
//! New directories are queued as registration requests and registered after
//! the batch.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::deps::DependencyCopyScheduler;
use crate::exec::MaterializeTrigger;
use crate::fs::FileSystem;
use crate::project::ManagedProject;
use crate::watch::backend::WatchBackend;
use crate::watch::event::{ChangeEvent, ChangeKind, WatchBatch};
use crate::watch::mapper::map_to_target;
use crate::watch::patterns::IgnoreSet;
use crate::watch::registrar::{register_tree, RegistrationMode, RegistrationRequest, WatchOwner};
use crate::watch::registry::{WatchHandle, WatchRegistry, WatchedDirectory};

/// Observable effect of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEffect {
    Copied { from: PathBuf, to: PathBuf },
    CreatedDir(PathBuf),
    Removed(PathBuf),
    /// Registered for watching after the batch.
    Registered(PathBuf),
    Evicted(PathBuf),
    MarkedDue,
    DescriptorChanged,
    Skipped { path: PathBuf, reason: SkipReason },
    Failed { path: PathBuf, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnknownHandle,
    ModifiedDirectory,
    Vanished,
    Unmapped,
    Ignored,
    /// A deletion whose target did not exist.
    NotDeployed,
}

/// Everything the dispatcher needs to know about its managed project.
#[derive(Debug, Clone)]
pub struct DispatchTarget {
    pub project: ManagedProject,
    /// The primary project's build descriptor; changes to it request a
    /// debounced materialization.
    pub descriptor_path: PathBuf,
    pub scheduler: Arc<DependencyCopyScheduler>,
    pub ignore: IgnoreSet,
    pub materialize_tx: Option<mpsc::UnboundedSender<MaterializeTrigger>>,
}

pub struct Dispatcher {
    registry: WatchRegistry,
    fs: Arc<dyn FileSystem>,
    target: DispatchTarget,
    /// Registration work-list, drained after each batch.
    pending: Vec<RegistrationRequest>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("deployment", &self.target.project.deployment_name)
            .field("watched", &self.registry.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(registry: WatchRegistry, fs: Arc<dyn FileSystem>, target: DispatchTarget) -> Self {
        Self {
            registry,
            fs,
            target,
            pending: Vec::new(),
        }
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    pub fn target(&self) -> &DispatchTarget {
        &self.target
    }

    /// Process one batch, then register queued directories and re-arm the
    /// batch's handle.
    ///
    /// Once `interrupted` is set, the remaining events of the batch are
    /// dropped and no registration or re-arming takes place.
    pub fn handle_batch(
        &mut self,
        backend: &mut dyn WatchBackend,
        batch: WatchBatch,
        interrupted: &AtomicBool,
    ) -> Vec<DispatchEffect> {
        let mut effects = Vec::new();

        for event in &batch.events {
            if interrupted.load(Ordering::SeqCst) {
                debug!(handle = ?batch.handle, "interrupted; dropping rest of batch");
                return effects;
            }
            self.handle_event(backend, &batch.handle, event, &mut effects);
        }

        self.drain_pending(backend, &mut effects);
        self.rearm(backend, &batch.handle, &mut effects);
        effects
    }

    fn handle_event(
        &mut self,
        backend: &mut dyn WatchBackend,
        handle: &WatchHandle,
        event: &ChangeEvent,
        effects: &mut Vec<DispatchEffect>,
    ) {
        let Some(dir) = self.registry.get(handle).cloned() else {
            trace!(handle = ?handle, "event for unknown handle");
            effects.push(DispatchEffect::Skipped {
                path: handle.dir().join(&event.name),
                reason: SkipReason::UnknownHandle,
            });
            return;
        };
        let path = dir.path.join(&event.name);
        debug!(kind = ?event.kind, path = ?path, "change event");

        if event.kind == ChangeKind::Modified {
            if self.fs.is_dir(&path) {
                effects.push(skipped(path, SkipReason::ModifiedDirectory));
                return;
            }
            if !self.fs.exists(&path) {
                effects.push(skipped(path, SkipReason::Vanished));
                return;
            }
        }

        if event.kind == ChangeKind::Deleted {
            self.evict_deleted_tree(backend, &path, effects);
        }

        if event.kind == ChangeKind::Created && self.fs.is_dir(&path) {
            // Queued regardless of mapping: an unmapped directory such as a
            // recreated `target/` is where mapped ones appear later.
            self.pending.push(RegistrationRequest {
                root: path.clone(),
                owner: owner_of(&dir),
            });
        }

        self.apply_deployment_effects(&dir, event.kind, &path, effects);

        if dir.is_dependency_project {
            self.target.scheduler.mark_due();
            effects.push(DispatchEffect::MarkedDue);
        } else if event.kind != ChangeKind::Deleted && path == self.target.descriptor_path {
            if let Some(tx) = &self.target.materialize_tx {
                if tx.send(MaterializeTrigger::DescriptorChanged).is_err() {
                    debug!("materialization loop gone; descriptor change not forwarded");
                }
            }
            effects.push(DispatchEffect::DescriptorChanged);
        }
    }

    fn apply_deployment_effects(
        &self,
        dir: &WatchedDirectory,
        kind: ChangeKind,
        path: &Path,
        effects: &mut Vec<DispatchEffect>,
    ) {
        if self.target.ignore.is_ignored(&dir.source_root, path) {
            effects.push(skipped(path.to_path_buf(), SkipReason::Ignored));
            return;
        }

        let Some(target) =
            map_to_target(path, &dir.source_root, &self.target.project.deployment_root)
        else {
            effects.push(skipped(path.to_path_buf(), SkipReason::Unmapped));
            return;
        };

        let res = match kind {
            ChangeKind::Created | ChangeKind::Modified => {
                self.mirror(path, &target).map(|effect| {
                    effect.unwrap_or_else(|| skipped(path.to_path_buf(), SkipReason::Vanished))
                })
            }
            ChangeKind::Deleted => self.remove_target(&target),
        };

        match res {
            Ok(effect) => effects.push(effect),
            Err(err) => {
                warn!(
                    path = ?path,
                    target = ?target,
                    error = %format!("{err:#}"),
                    "failed to apply change; skipping event"
                );
                effects.push(DispatchEffect::Failed {
                    path: path.to_path_buf(),
                    error: format!("{err:#}"),
                });
            }
        }
    }

    /// Make `target` reflect `path`. `Ok(None)` if `path` is already gone.
    fn mirror(&self, path: &Path, target: &Path) -> Result<Option<DispatchEffect>> {
        if self.fs.is_dir(path) {
            self.fs.create_dir_all(target)?;
            return Ok(Some(DispatchEffect::CreatedDir(target.to_path_buf())));
        }
        if !self.fs.is_file(path) {
            return Ok(None);
        }

        if let Some(parent) = target.parent() {
            self.fs
                .create_dir_all(parent)
                .with_context(|| format!("preparing target directory for {:?}", target))?;
        }
        self.fs.copy_file(path, target)?;
        Ok(Some(DispatchEffect::Copied {
            from: path.to_path_buf(),
            to: target.to_path_buf(),
        }))
    }

    fn remove_target(&self, target: &Path) -> Result<DispatchEffect> {
        if self.fs.remove(target)? {
            return Ok(DispatchEffect::Removed(target.to_path_buf()));
        }
        debug!(target = ?target, "deleted path had no deployed counterpart");
        Ok(skipped(target.to_path_buf(), SkipReason::NotDeployed))
    }

    /// A deleted path that was itself watched takes its subtree's
    /// registrations with it.
    fn evict_deleted_tree(
        &mut self,
        backend: &mut dyn WatchBackend,
        path: &Path,
        effects: &mut Vec<DispatchEffect>,
    ) {
        if !self.registry.contains_dir(path) {
            return;
        }
        for handle in self.registry.evict_tree(path) {
            release(backend, &handle);
            effects.push(DispatchEffect::Evicted(handle.dir().to_path_buf()));
        }
    }

    fn drain_pending(&mut self, backend: &mut dyn WatchBackend, effects: &mut Vec<DispatchEffect>) {
        while let Some(request) = self.pending.pop() {
            let registered = match register_tree(
                self.fs.as_ref(),
                backend,
                &mut self.registry,
                &request,
                RegistrationMode::Dynamic,
            ) {
                Ok(dirs) => dirs,
                Err(err) => {
                    warn!(dir = ?request.root, error = %format!("{err:#}"), "directory left unwatched");
                    continue;
                }
            };

            for dir in registered {
                effects.push(DispatchEffect::Registered(dir.clone()));
                self.mirror_existing(&dir, effects);
            }
        }
    }

    /// Mirror entries that appeared in a new directory before its watch was
    /// in place.
    ///
    /// Never marks the dependency copy due: the Created event that queued the
    /// directory already did.
    fn mirror_existing(&self, dir: &Path, effects: &mut Vec<DispatchEffect>) {
        let Some(watched) = self
            .registry
            .handle_for(dir)
            .and_then(|handle| self.registry.get(handle))
            .cloned()
        else {
            return;
        };
        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = ?dir, error = %format!("{err:#}"), "cannot list new directory");
                return;
            }
        };
        for entry in entries {
            self.apply_deployment_effects(&watched, ChangeKind::Created, &entry, effects);
        }
    }

    /// Drop the registration of a directory that no longer exists.
    fn rearm(&mut self, backend: &mut dyn WatchBackend, handle: &WatchHandle, effects: &mut Vec<DispatchEffect>) {
        let Some(dir) = self.registry.get(handle) else {
            return;
        };
        if self.fs.is_dir(&dir.path) {
            return;
        }

        let path = dir.path.clone();
        for evicted in self.registry.evict_tree(&path) {
            release(backend, &evicted);
            effects.push(DispatchEffect::Evicted(evicted.dir().to_path_buf()));
        }
        debug!(dir = ?path, "watched directory is gone; registration evicted");
    }
}

fn owner_of(dir: &WatchedDirectory) -> WatchOwner {
    WatchOwner {
        source_root: dir.source_root.clone(),
        deployment: dir.deployment.clone(),
        is_dependency_project: dir.is_dependency_project,
        descriptor: dir.descriptor.clone(),
    }
}

fn skipped(path: PathBuf, reason: SkipReason) -> DispatchEffect {
    DispatchEffect::Skipped { path, reason }
}

fn release(backend: &mut dyn WatchBackend, handle: &WatchHandle) {
    // The OS usually dropped the watch together with the directory.
    if let Err(err) = backend.unregister(handle) {
        trace!(dir = ?handle.dir(), error = %format!("{err:#}"), "unregister failed");
    }
}
