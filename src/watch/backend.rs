// src/watch/backend.rs

//! Pluggable change-notification backend.
//!
//! - [`NotifyBackend`] is the production implementation on top of `notify`.
//!   Every directory gets its own non-recursive watch; new subdirectories are
//!   registered explicitly by the dispatch loop.
//! - Tests provide their own [`WatchBackend`] that just records registrations.

use std::path::Path;

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::watch::event::{ChangeEvent, ChangeKind, WatchBatch, WorkerMessage};
use crate::watch::registry::WatchHandle;

/// Registers directories for created / modified / deleted notifications.
pub trait WatchBackend: Send {
    fn register(&mut self, dir: &Path) -> Result<WatchHandle>;
    fn unregister(&mut self, handle: &WatchHandle) -> Result<()>;
}

/// Backend driven by `notify::RecommendedWatcher`.
///
/// Dropping it closes every registration.
pub struct NotifyBackend {
    watcher: RecommendedWatcher,
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend").finish()
    }
}

impl NotifyBackend {
    /// Create a backend forwarding translated batches to `tx`.
    pub fn new(tx: mpsc::UnboundedSender<WorkerMessage>) -> Result<Self> {
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for batch in batches_from_event(&event) {
                        if tx.send(WorkerMessage::Batch(batch)).is_err() {
                            debug!("dispatch worker gone; dropping notify event");
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "file watch error");
                }
            },
            Config::default(),
        )
        .context("creating file watcher")?;

        Ok(Self { watcher })
    }
}

impl WatchBackend for NotifyBackend {
    fn register(&mut self, dir: &Path) -> Result<WatchHandle> {
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching directory {:?}", dir))?;
        Ok(WatchHandle::for_dir(dir))
    }

    fn unregister(&mut self, handle: &WatchHandle) -> Result<()> {
        self.watcher
            .unwatch(handle.dir())
            .with_context(|| format!("unwatching directory {:?}", handle.dir()))
    }
}

/// Translate one notify event into per-directory batches.
///
/// Renames become a delete of the old name followed by a create of the new
/// one; access and unclassified events are ignored.
pub fn batches_from_event(event: &Event) -> Vec<WatchBatch> {
    let changes: Vec<(ChangeKind, &Path)> = match &event.kind {
        EventKind::Create(_) => tag(event, ChangeKind::Created),
        EventKind::Remove(_) => tag(event, ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => tag(event, ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => tag(event, ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let kind = if i == 0 {
                    ChangeKind::Deleted
                } else {
                    ChangeKind::Created
                };
                (kind, p.as_path())
            })
            .collect(),
        // Backends that cannot tell the two ends of a rename apart.
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if p.exists() {
                    ChangeKind::Created
                } else {
                    ChangeKind::Deleted
                };
                (kind, p.as_path())
            })
            .collect(),
        EventKind::Modify(_) => tag(event, ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };

    let mut batches: Vec<WatchBatch> = Vec::new();
    for (kind, path) in changes {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            continue;
        };
        let handle = WatchHandle::for_dir(parent);
        let change = ChangeEvent::new(kind, name);

        if let Some(last) = batches.last_mut().filter(|b| b.handle == handle) {
            last.events.push(change);
            continue;
        }
        batches.push(WatchBatch {
            handle,
            events: vec![change],
        });
    }
    batches
}

fn tag(event: &Event, kind: ChangeKind) -> Vec<(ChangeKind, &Path)> {
    event.paths.iter().map(|p| (kind, p.as_path())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut ev = Event::new(kind);
        for p in paths {
            ev = ev.add_path(PathBuf::from(p));
        }
        ev
    }

    #[test]
    fn create_becomes_single_batch_for_parent() {
        let batches = batches_from_event(&event(
            EventKind::Create(CreateKind::File),
            &["/ws/app/src/main/webapp/index.html"],
        ));
        assert_eq!(
            batches,
            vec![WatchBatch {
                handle: WatchHandle::for_dir("/ws/app/src/main/webapp"),
                events: vec![ChangeEvent::new(ChangeKind::Created, "index.html")],
            }]
        );
    }

    #[test]
    fn rename_both_is_delete_then_create() {
        let batches = batches_from_event(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/ws/a/old.txt", "/ws/a/new.txt"],
        ));
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].events,
            vec![
                ChangeEvent::new(ChangeKind::Deleted, "old.txt"),
                ChangeEvent::new(ChangeKind::Created, "new.txt"),
            ]
        );
    }

    #[test]
    fn rename_across_directories_yields_two_batches() {
        let batches = batches_from_event(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/ws/a/f.txt", "/ws/b/f.txt"],
        ));
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].handle, WatchHandle::for_dir("/ws/a"));
        assert_eq!(batches[1].handle, WatchHandle::for_dir("/ws/b"));
    }

    #[test]
    fn kinds_are_translated() {
        let modified = batches_from_event(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/ws/a/f.txt"],
        ));
        assert_eq!(modified[0].events[0].kind, ChangeKind::Modified);

        let removed =
            batches_from_event(&event(EventKind::Remove(RemoveKind::File), &["/ws/a/f.txt"]));
        assert_eq!(removed[0].events[0].kind, ChangeKind::Deleted);

        let access = batches_from_event(&event(
            EventKind::Access(notify::event::AccessKind::Any),
            &["/ws/a/f.txt"],
        ));
        assert!(access.is_empty());
    }
}
