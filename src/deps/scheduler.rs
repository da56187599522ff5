// src/deps/scheduler.rs

//! Decides when the library directory of a managed project must be
//! re-materialized.
//!
//! Materialization is due when the marker is missing, empty, unreadable, or
//! strictly older than the build descriptor. A successful run rewrites the
//! marker with the time the run started, so a descriptor saved while the run
//! was in flight still counts as newer. If [`mark_due`] was called during the
//! run, the marker stays stale.
//!
//! [`mark_due`]: DependencyCopyScheduler::mark_due

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use tracing::{debug, error, info, warn};

use crate::deps::marker::MarkerStore;
use crate::exec::backend::{MaterializationRequest, Materializer};
use crate::fs::FileSystem;
use crate::project::ManagedProject;

/// Result of [`DependencyCopyScheduler::run_if_due`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializationOutcome {
    NotDue,
    Completed,
    /// The run succeeded but the project was marked due meanwhile.
    Superseded,
    Failed,
}

#[derive(Debug, Default)]
struct MarkerState {
    /// Bumped by every `mark_due`.
    generation: u64,
    /// Marker known to be removed since the last store.
    cleared: bool,
}

#[derive(Debug)]
pub struct DependencyCopyScheduler {
    project: ManagedProject,
    descriptor_path: PathBuf,
    marker: MarkerStore,
    fs: Arc<dyn FileSystem>,
    state: Mutex<MarkerState>,
    run_lock: tokio::sync::Mutex<()>,
}

impl DependencyCopyScheduler {
    pub fn new(
        project: ManagedProject,
        descriptor_path: PathBuf,
        marker: MarkerStore,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            project,
            descriptor_path,
            marker,
            fs,
            state: Mutex::new(MarkerState::default()),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn project(&self) -> &ManagedProject {
        &self.project
    }

    /// Build descriptor whose modification time the marker is compared to.
    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor_path
    }

    pub fn marker(&self) -> &MarkerStore {
        &self.marker
    }

    /// Whether library materialization is currently due.
    pub fn is_due(&self) -> bool {
        let _state = self.lock_state();
        self.evaluate()
    }

    /// Invalidate the marker so the next due-check reports `true`.
    pub fn mark_due(&self) {
        let mut state = self.lock_state();
        state.generation += 1;
        if state.cleared {
            return;
        }
        match self.marker.clear() {
            Ok(()) => {
                state.cleared = true;
                debug!(
                    deployment = %self.project.deployment_name,
                    "dependency project changed; library materialization marked due"
                );
            }
            Err(err) => {
                warn!(
                    deployment = %self.project.deployment_name,
                    error = %format!("{err:#}"),
                    "failed to invalidate dependency marker"
                );
            }
        }
    }

    /// Run `materializer` if materialization is due.
    ///
    /// Runs are serialised; failures are logged and leave the marker stale so
    /// the next evaluation retries.
    pub async fn run_if_due(&self, materializer: &dyn Materializer) -> MaterializationOutcome {
        let _run = self.run_lock.lock().await;

        let generation = {
            let state = self.lock_state();
            if !self.evaluate() {
                debug!(
                    deployment = %self.project.deployment_name,
                    "libraries up to date; skipping materialization"
                );
                return MaterializationOutcome::NotDue;
            }
            state.generation
        };

        let request = MaterializationRequest {
            project_root: self.project.source_root.clone(),
            output_dir: self.project.library_dir(),
        };
        info!(
            deployment = %self.project.deployment_name,
            output = ?request.output_dir,
            "materializing project libraries"
        );

        let started = SystemTime::now();
        match materializer.materialize(&request).await {
            Ok(()) => self.record_success(generation, started),
            Err(err) => {
                error!(
                    deployment = %self.project.deployment_name,
                    error = %format!("{err:#}"),
                    "library materialization failed; will retry on next evaluation"
                );
                MaterializationOutcome::Failed
            }
        }
    }

    fn record_success(&self, generation: u64, started: SystemTime) -> MaterializationOutcome {
        let mut state = self.lock_state();
        if state.generation != generation {
            info!(
                deployment = %self.project.deployment_name,
                "dependency projects changed during materialization; marker left stale"
            );
            return MaterializationOutcome::Superseded;
        }

        match self.marker.store(started) {
            Ok(()) => {
                state.cleared = false;
                info!(deployment = %self.project.deployment_name, "library materialization complete");
            }
            Err(err) => {
                warn!(
                    deployment = %self.project.deployment_name,
                    error = %format!("{err:#}"),
                    "materialization succeeded but the marker could not be written"
                );
            }
        }
        MaterializationOutcome::Completed
    }

    /// Caller must hold the state lock.
    fn evaluate(&self) -> bool {
        let recorded = match self.marker.load() {
            Ok(Some(time)) => time,
            Ok(None) => return true,
            Err(err) => {
                debug!(error = %format!("{err:#}"), "unreadable marker; treating as due");
                return true;
            }
        };

        match self.fs.modified(&self.descriptor_path) {
            Ok(descriptor_time) => recorded < descriptor_time,
            Err(err) => {
                warn!(
                    descriptor = ?self.descriptor_path,
                    error = %format!("{err:#}"),
                    "cannot read build descriptor time; treating materialization as due"
                );
                true
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MarkerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
