// src/engine/worker.rs

//! The dispatch worker thread.
//!
//! One dedicated OS thread per engine. It owns the [`Dispatcher`] (and with
//! it the registry) and the watch backend; nothing else touches either once
//! the thread is running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::dispatch::Dispatcher;
use crate::watch::backend::WatchBackend;
use crate::watch::event::WorkerMessage;

/// Consume worker messages until shutdown.
///
/// The backend is dropped on return, which closes every registration.
pub fn run_worker<B: WatchBackend>(
    mut dispatcher: Dispatcher,
    mut backend: B,
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
    interrupted: Arc<AtomicBool>,
) -> Dispatcher {
    let deployment = dispatcher.target().project.deployment_name.clone();
    info!(
        deployment = %deployment,
        watched = dispatcher.registry().len(),
        "dispatch worker started"
    );

    while let Some(message) = rx.blocking_recv() {
        if interrupted.load(Ordering::SeqCst) {
            break;
        }
        match message {
            WorkerMessage::Batch(batch) => {
                let effects = dispatcher.handle_batch(&mut backend, batch, &interrupted);
                debug!(deployment = %deployment, effects = effects.len(), "batch dispatched");
            }
            WorkerMessage::Shutdown => break,
        }
    }

    drop(backend);
    info!(deployment = %deployment, "dispatch worker finished");
    dispatcher
}

/// Start [`run_worker`] on a named thread.
pub fn spawn_worker<B: WatchBackend + 'static>(
    dispatcher: Dispatcher,
    backend: B,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
    interrupted: Arc<AtomicBool>,
) -> Result<JoinHandle<Dispatcher>> {
    let name = format!("deploysync-{}", dispatcher.target().project.deployment_name);
    std::thread::Builder::new()
        .name(name)
        .spawn(move || run_worker(dispatcher, backend, rx, interrupted))
        .context("spawning dispatch worker thread")
}
