// src/engine/lifecycle.rs

//! Start and stop of one engine instance (one managed project).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::deps::{DependencyCopyScheduler, MarkerStore};
use crate::engine::dispatch::{DispatchTarget, Dispatcher};
use crate::engine::worker::spawn_worker;
use crate::errors::{DeploySyncError, Result};
use crate::exec::{spawn_materialize_loop, MaterializeLoop, Materializer};
use crate::fs::FileSystem;
use crate::project::{
    discover_dependency_projects, resolve_deployment_root, BuildModelProvider, DependencyProject,
    ManagedProject, ProjectDescriptor,
};
use crate::types::{EngineState, MaterializeMode};
use crate::watch::backend::{NotifyBackend, WatchBackend};
use crate::watch::event::WorkerMessage;
use crate::watch::patterns::IgnoreSet;
use crate::watch::registrar::{
    claim_registered_subtree, register_tree, RegistrationMode, RegistrationRequest, WatchOwner,
};
use crate::watch::registry::WatchRegistry;

/// Per-project settings, derived from the config file.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub source_root: PathBuf,
    pub deployments_root: PathBuf,
    pub default_root: String,
    pub marker_dir: PathBuf,
    pub materialize_mode: MaterializeMode,
    pub debounce: Duration,
    pub ignore: Vec<String>,
}

/// External collaborators of an engine.
#[derive(Clone)]
pub struct Collaborators {
    pub fs: Arc<dyn FileSystem>,
    pub provider: Arc<dyn BuildModelProvider>,
    /// `None` disables library materialization entirely.
    pub materializer: Option<Arc<dyn Materializer>>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("fs", &self.fs)
            .field("provider", &self.provider)
            .field("materializer", &self.materializer.is_some())
            .finish()
    }
}

/// What an engine would manage, resolved without watching anything.
#[derive(Debug, Clone)]
pub struct ProjectPlan {
    pub project: ManagedProject,
    pub descriptor: Arc<ProjectDescriptor>,
    pub descriptor_path: PathBuf,
    pub dependency_projects: Vec<DependencyProject>,
}

/// Load the primary descriptor, resolve the deployment and discover
/// dependency projects.
///
/// A missing or unparseable primary descriptor is a fatal-init error.
pub fn plan_project(settings: &EngineSettings, collab: &Collaborators) -> Result<ProjectPlan> {
    let source_root = collab
        .fs
        .canonicalize(&settings.source_root)
        .unwrap_or_else(|_| settings.source_root.clone());
    let descriptor_path = collab.provider.descriptor_path(&source_root);

    let descriptor = match collab.provider.load(&source_root) {
        Ok(Some(desc)) => desc,
        Ok(None) => {
            return Err(DeploySyncError::Descriptor {
                path: descriptor_path,
                message: "no build descriptor found".to_string(),
            });
        }
        Err(err) => {
            return Err(DeploySyncError::Descriptor {
                path: descriptor_path,
                message: format!("{err:#}"),
            });
        }
    };

    let deployment_name = descriptor.deployment_name().to_string();
    let deployment_root = resolve_deployment_root(
        collab.fs.as_ref(),
        &settings.deployments_root,
        &deployment_name,
        &settings.default_root,
    );

    let dependency_projects = discover_dependency_projects(&descriptor, collab.provider.as_ref());

    Ok(ProjectPlan {
        project: ManagedProject {
            deployment_name,
            source_root,
            deployment_root,
        },
        descriptor: Arc::new(descriptor),
        descriptor_path,
        dependency_projects,
    })
}

/// Build the scheduler for a plan.
pub fn scheduler_for(
    plan: &ProjectPlan,
    settings: &EngineSettings,
    fs: Arc<dyn FileSystem>,
) -> DependencyCopyScheduler {
    let marker = MarkerStore::new(&settings.marker_dir, &plan.project.deployment_name, fs.clone());
    DependencyCopyScheduler::new(plan.project.clone(), plan.descriptor_path.clone(), marker, fs)
}

/// A running engine.
///
/// Lifecycle: `Initializing` (inside [`Engine::start`]) → `Watching` →
/// `ShuttingDown` (after [`Engine::stop`]).
pub struct Engine {
    plan: ProjectPlan,
    scheduler: Arc<DependencyCopyScheduler>,
    state: EngineState,
    interrupted: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<WorkerMessage>,
    worker: Option<JoinHandle<Dispatcher>>,
    materialize_loop: Option<MaterializeLoop>,
    startup_run: Option<tokio::task::JoinHandle<()>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("deployment", &self.plan.project.deployment_name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Start an engine watching through `notify`.
    pub async fn start(settings: EngineSettings, collab: Collaborators) -> Result<Engine> {
        Self::start_with(settings, collab, NotifyBackend::new).await
    }

    /// Start an engine with a custom watch backend.
    ///
    /// `make_backend` receives the sender the backend must push batches to.
    pub async fn start_with<B, F>(
        settings: EngineSettings,
        collab: Collaborators,
        make_backend: F,
    ) -> Result<Engine>
    where
        B: WatchBackend + 'static,
        F: FnOnce(mpsc::UnboundedSender<WorkerMessage>) -> anyhow::Result<B>,
    {
        let state = EngineState::Initializing;
        info!(root = ?settings.source_root, %state, "starting engine");

        let plan = plan_project(&settings, &collab)?;
        let project = &plan.project;
        info!(
            deployment = %project.deployment_name,
            deployment_root = ?project.deployment_root,
            dependency_projects = plan.dependency_projects.len(),
            "resolved managed project"
        );

        let (tx, rx) = mpsc::unbounded_channel::<WorkerMessage>();
        let mut backend = make_backend(tx.clone())?;
        let mut registry = WatchRegistry::new();

        register_tree(
            collab.fs.as_ref(),
            &mut backend,
            &mut registry,
            &RegistrationRequest {
                root: project.source_root.clone(),
                owner: WatchOwner {
                    source_root: project.source_root.clone(),
                    deployment: project.deployment_name.clone(),
                    is_dependency_project: false,
                    descriptor: Some(Arc::clone(&plan.descriptor)),
                },
            },
            RegistrationMode::Initial,
        )
        .map_err(|err| {
            error!(root = ?project.source_root, error = %format!("{err:#}"), "initial watch registration failed");
            DeploySyncError::Other(err)
        })?;

        for dep in &plan.dependency_projects {
            info!(project = %dep.descriptor.key, root = ?dep.root, "watching dependency project");
            let request = RegistrationRequest {
                root: dep.root.clone(),
                owner: WatchOwner {
                    source_root: dep.root.clone(),
                    deployment: project.deployment_name.clone(),
                    is_dependency_project: true,
                    descriptor: Some(Arc::new(dep.descriptor.clone())),
                },
            };
            let claimed = claim_registered_subtree(&mut registry, &request);
            if claimed > 0 {
                warn!(
                    project = %dep.descriptor.key,
                    root = ?dep.root,
                    directories = claimed,
                    "dependency project lies inside an already watched tree; its directories now count as dependency changes"
                );
            }
            register_tree(
                collab.fs.as_ref(),
                &mut backend,
                &mut registry,
                &request,
                RegistrationMode::Dynamic,
            )?;
        }

        let scheduler = Arc::new(scheduler_for(&plan, &settings, collab.fs.clone()));

        let mut startup_run = None;
        let mut materialize_loop = None;
        if let Some(materializer) = &collab.materializer {
            match settings.materialize_mode {
                MaterializeMode::Blocking => {
                    scheduler.run_if_due(materializer.as_ref()).await;
                }
                MaterializeMode::Background => {
                    let scheduler = Arc::clone(&scheduler);
                    let materializer = Arc::clone(materializer);
                    startup_run = Some(tokio::spawn(async move {
                        scheduler.run_if_due(materializer.as_ref()).await;
                    }));
                }
            }
            materialize_loop = Some(spawn_materialize_loop(
                Arc::clone(&scheduler),
                Arc::clone(materializer),
                settings.debounce,
            ));
        }

        let ignore = IgnoreSet::new(&settings.ignore)?;
        let dispatcher = Dispatcher::new(
            registry,
            collab.fs.clone(),
            DispatchTarget {
                project: project.clone(),
                descriptor_path: plan.descriptor_path.clone(),
                scheduler: Arc::clone(&scheduler),
                ignore,
                materialize_tx: materialize_loop.as_ref().map(|l| l.tx.clone()),
            },
        );

        let interrupted = Arc::new(AtomicBool::new(false));
        let worker = spawn_worker(dispatcher, backend, rx, Arc::clone(&interrupted))?;

        let state = EngineState::Watching;
        info!(deployment = %project.deployment_name, %state, "engine running");

        Ok(Engine {
            plan,
            scheduler,
            state,
            interrupted,
            tx,
            worker: Some(worker),
            materialize_loop,
            startup_run,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn project(&self) -> &ManagedProject {
        &self.plan.project
    }

    pub fn plan(&self) -> &ProjectPlan {
        &self.plan
    }

    pub fn scheduler(&self) -> &Arc<DependencyCopyScheduler> {
        &self.scheduler
    }

    /// Interrupt the worker, close all watches and stop background
    /// materialization.
    ///
    /// Best effort: problems are logged, never returned. Calling it twice is
    /// harmless.
    pub fn stop(&mut self) {
        if self.state == EngineState::ShuttingDown {
            return;
        }
        self.state = EngineState::ShuttingDown;
        let deployment = &self.plan.project.deployment_name;
        info!(deployment = %deployment, state = %self.state, "stopping engine");

        self.interrupted.store(true, Ordering::SeqCst);
        if self.tx.send(WorkerMessage::Shutdown).is_err() {
            warn!(deployment = %deployment, "dispatch worker already gone");
        }

        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(dispatcher) => info!(
                    deployment = %deployment,
                    watched = dispatcher.registry().len(),
                    "dispatch worker joined"
                ),
                Err(_) => error!(deployment = %deployment, "dispatch worker panicked"),
            }
        }

        if let Some(lp) = self.materialize_loop.take() {
            lp.handle.abort();
        }
        if let Some(run) = self.startup_run.take() {
            run.abort();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}
