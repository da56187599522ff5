// src/watch/registry.rs

//! Registration handles and the per-handle metadata table.
//!
//! The table is a plain owned struct with no interior mutability: during
//! startup the initialising thread fills it, then it is moved into the
//! dispatch worker, which is its only user from then on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::project::ProjectDescriptor;

/// Opaque identifier of one directory registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(PathBuf);

impl WatchHandle {
    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        Self(dir.into())
    }

    pub fn dir(&self) -> &Path {
        &self.0
    }
}

/// Metadata needed to interpret events of one watched directory.
#[derive(Debug, Clone)]
pub struct WatchedDirectory {
    pub path: PathBuf,
    /// Root of the project this directory belongs to; mapping is computed
    /// relative to it.
    pub source_root: PathBuf,
    /// Deployment name of the owning managed project.
    pub deployment: String,
    pub is_dependency_project: bool,
    pub descriptor: Option<Arc<ProjectDescriptor>>,
}

#[derive(Debug, Default)]
pub struct WatchRegistry {
    entries: HashMap<WatchHandle, WatchedDirectory>,
    /// Directory path to handle; backends are free to hand out handles that
    /// are not the path itself.
    by_path: HashMap<PathBuf, WatchHandle>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: WatchHandle, dir: WatchedDirectory) {
        if let Some(stale) = self.by_path.insert(dir.path.clone(), handle.clone()) {
            if stale != handle {
                self.entries.remove(&stale);
            }
        }
        if let Some(previous) = self.entries.insert(handle.clone(), dir) {
            self.unindex(&previous.path, &handle);
        }
    }

    pub fn get(&self, handle: &WatchHandle) -> Option<&WatchedDirectory> {
        self.entries.get(handle)
    }

    pub fn handle_for(&self, dir: &Path) -> Option<&WatchHandle> {
        self.by_path.get(dir)
    }

    pub fn contains_dir(&self, dir: &Path) -> bool {
        self.by_path.contains_key(dir)
    }

    pub fn evict(&mut self, handle: &WatchHandle) -> Option<WatchedDirectory> {
        let dir = self.entries.remove(handle)?;
        self.unindex(&dir.path, handle);
        Some(dir)
    }

    /// Evict `root` and every registered directory below it.
    pub fn evict_tree(&mut self, root: &Path) -> Vec<WatchHandle> {
        let handles: Vec<WatchHandle> = self
            .by_path
            .iter()
            .filter(|(path, _)| path.starts_with(root))
            .map(|(_, h)| h.clone())
            .collect();
        for handle in &handles {
            self.evict(handle);
        }
        handles
    }

    /// Apply `update` to `root` and every registered directory below it.
    /// Returns how many entries were touched.
    pub fn update_tree(&mut self, root: &Path, mut update: impl FnMut(&mut WatchedDirectory)) -> usize {
        let mut touched = 0;
        for dir in self.entries.values_mut().filter(|d| d.path.starts_with(root)) {
            update(dir);
            touched += 1;
        }
        touched
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered directory paths, sorted.
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.entries.values().map(|d| d.path.clone()).collect();
        dirs.sort();
        dirs
    }

    /// Registered directories belonging to dependency projects, sorted.
    pub fn dependency_directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .entries
            .values()
            .filter(|d| d.is_dependency_project)
            .map(|d| d.path.clone())
            .collect();
        dirs.sort();
        dirs
    }

    fn unindex(&mut self, path: &Path, handle: &WatchHandle) {
        if self.by_path.get(path) == Some(handle) {
            self.by_path.remove(path);
        }
    }
}
