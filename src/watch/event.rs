// src/watch/event.rs

//! Change notifications as seen by the dispatch loop.

use std::path::PathBuf;

use crate::watch::registry::WatchHandle;

/// The three change kinds every directory is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// One change to an entry of a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Entry name relative to the watched directory.
    pub name: PathBuf,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, name: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Changes reported for a single registration handle, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBatch {
    pub handle: WatchHandle,
    pub events: Vec<ChangeEvent>,
}

/// Messages consumed by the dispatch worker.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Batch(WatchBatch),
    /// Wake the worker so it can observe the interrupt flag and exit.
    Shutdown,
}
