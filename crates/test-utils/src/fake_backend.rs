use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use deploysync::watch::{WatchBackend, WatchBatch, WatchHandle, WorkerMessage};

#[derive(Debug, Default)]
struct BackendState {
    registered: Vec<PathBuf>,
    unregistered: Vec<PathBuf>,
    refuse: HashSet<PathBuf>,
    tx: Option<mpsc::UnboundedSender<WorkerMessage>>,
}

/// A fake watch backend that:
/// - records registrations and unregistrations
/// - refuses directories it was told to refuse
/// - lets the test inject batches into the engine it was handed to.
///
/// Clones share state, so keep one clone in the test and move the other into
/// the engine.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to the worker channel (what `Engine::start_with` passes to the
    /// backend factory).
    pub fn connect(&self, tx: mpsc::UnboundedSender<WorkerMessage>) -> Self {
        self.state.lock().unwrap().tx = Some(tx);
        self.clone()
    }

    pub fn refuse(&self, dir: impl Into<PathBuf>) {
        self.state.lock().unwrap().refuse.insert(dir.into());
    }

    pub fn registered(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().registered.clone()
    }

    pub fn unregistered(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().unregistered.clone()
    }

    pub fn is_registered(&self, dir: impl AsRef<Path>) -> bool {
        let state = self.state.lock().unwrap();
        let dir = dir.as_ref();
        state.registered.iter().any(|d| d == dir) && !state.unregistered.iter().any(|d| d == dir)
    }

    /// Push a batch to the connected worker.
    pub fn emit(&self, batch: WatchBatch) {
        let state = self.state.lock().unwrap();
        let tx = state.tx.as_ref().expect("FakeBackend::emit before connect");
        tx.send(WorkerMessage::Batch(batch)).expect("worker gone");
    }
}

impl WatchBackend for FakeBackend {
    fn register(&mut self, dir: &Path) -> Result<WatchHandle> {
        let mut state = self.state.lock().unwrap();
        if state.refuse.contains(dir) {
            return Err(anyhow!("permission denied: {:?}", dir));
        }
        state.registered.push(dir.to_path_buf());
        Ok(WatchHandle::for_dir(dir))
    }

    fn unregister(&mut self, handle: &WatchHandle) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .unregistered
            .push(handle.dir().to_path_buf());
        Ok(())
    }
}
