// src/exec/materialize_loop.rs

//! Background loop that re-materializes libraries after build descriptor
//! changes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::deps::DependencyCopyScheduler;
use crate::exec::backend::Materializer;

/// Why a materialization was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeTrigger {
    /// The primary project's build descriptor was created or modified.
    DescriptorChanged,
}

/// Handle to a running materialization loop.
///
/// Dropping every sender clone ends the loop once it is idle.
#[derive(Debug)]
pub struct MaterializeLoop {
    pub tx: mpsc::UnboundedSender<MaterializeTrigger>,
    pub handle: JoinHandle<()>,
}

/// Spawn the debounced materialization loop.
///
/// Requests arriving within `debounce` of each other collapse into a single
/// `run_if_due`. Runs never overlap: the next burst is only collected after
/// the current run finished.
pub fn spawn_materialize_loop(
    scheduler: Arc<DependencyCopyScheduler>,
    materializer: Arc<dyn Materializer>,
    debounce: Duration,
) -> MaterializeLoop {
    let (tx, mut rx) = mpsc::unbounded_channel::<MaterializeTrigger>();

    let handle = tokio::spawn(async move {
        let deployment = scheduler.project().deployment_name.clone();
        info!(deployment = %deployment, "materialization loop started");

        while let Some(trigger) = rx.recv().await {
            debug!(deployment = %deployment, ?trigger, "materialization requested");

            let mut collapsed = 0usize;
            let mut closed = false;
            loop {
                match tokio::time::timeout(debounce, rx.recv()).await {
                    Ok(Some(_)) => collapsed += 1,
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_elapsed) => break,
                }
            }
            if collapsed > 0 {
                debug!(deployment = %deployment, collapsed, "collapsed materialization requests");
            }

            // A request already received is honoured even if the senders are gone.
            let outcome = scheduler.run_if_due(materializer.as_ref()).await;
            debug!(deployment = %deployment, ?outcome, "debounced materialization finished");
            if closed {
                break;
            }
        }

        info!(deployment = %deployment, "materialization loop finished (channel closed)");
    });

    MaterializeLoop { tx, handle }
}
