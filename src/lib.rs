// src/lib.rs

pub mod cli;
pub mod config;
pub mod deps;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod project;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use regex::Regex;
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, resolve_project_paths, ConfigFile};
use crate::engine::{plan_project, scheduler_for, Collaborators, Engine, EngineSettings};
use crate::exec::{CommandMaterializer, Materializer};
use crate::fs::{FileSystem, RealFileSystem};
use crate::project::PomModelProvider;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the list of managed projects
/// - one engine per project
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let collab = Collaborators {
        fs: fs.clone(),
        provider: Arc::new(PomModelProvider::new(fs.clone())),
        materializer: build_materializer(&cfg)?,
    };

    let project_paths =
        resolve_project_paths(&cfg, fs.as_ref(), &args.projects, args.agent_name.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg, &collab, &project_paths);
        return Ok(());
    }

    // A project that fails to start does not prevent the others.
    let mut engines = Vec::new();
    for path in &project_paths {
        match Engine::start(engine_settings(&cfg, path.clone()), collab.clone()).await {
            Ok(engine) => engines.push(engine),
            Err(err) => error!(project = ?path, error = %err, "failed to start engine"),
        }
    }

    if engines.is_empty() {
        bail!("no project could be started");
    }
    info!(running = engines.len(), "deploysync running; press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("failed to listen for Ctrl+C: {e}");
    }

    for engine in engines.iter_mut() {
        engine.stop();
    }
    info!("all engines stopped");
    Ok(())
}

/// Settings for the engine managing `source_root`.
pub fn engine_settings(cfg: &ConfigFile, source_root: PathBuf) -> EngineSettings {
    let section = cfg.config_section();
    EngineSettings {
        source_root,
        deployments_root: cfg.deployments_root(),
        default_root: section.default_root.clone(),
        marker_dir: cfg.marker_dir(),
        materialize_mode: section.materialize_mode,
        debounce: cfg.debounce(),
        ignore: section.ignore.clone(),
    }
}

fn build_materializer(cfg: &ConfigFile) -> Result<Option<Arc<dyn Materializer>>> {
    let section = cfg.materialize_section();
    if !section.enabled {
        debug!("library materialization disabled");
        return Ok(None);
    }
    let failure_pattern = section
        .failure_pattern
        .as_deref()
        .map(Regex::new)
        .transpose()?;
    Ok(Some(Arc::new(CommandMaterializer::new(
        section.cmd.clone(),
        failure_pattern,
    ))))
}

/// Simple dry-run output: print projects, deployments and dependency
/// projects.
fn print_dry_run(cfg: &ConfigFile, collab: &Collaborators, project_paths: &[PathBuf]) {
    let section = cfg.config_section();
    println!("deploysync dry-run");
    println!("  config.deployments_root = {:?}", cfg.deployments_root());
    println!("  config.default_root = {}", section.default_root);
    println!("  config.marker_dir = {:?}", cfg.marker_dir());
    println!("  config.materialize_mode = {:?}", section.materialize_mode);
    println!();

    println!("projects ({}):", project_paths.len());
    for path in project_paths {
        let settings = engine_settings(cfg, path.clone());
        let plan = match plan_project(&settings, collab) {
            Ok(plan) => plan,
            Err(err) => {
                println!("  - {:?}", path);
                println!("      error: {err}");
                continue;
            }
        };

        println!("  - {}", plan.project.deployment_name);
        println!("      source: {:?}", plan.project.source_root);
        println!("      deployment: {:?}", plan.project.deployment_root);
        for dep in &plan.dependency_projects {
            println!("      dependency project: {} ({:?})", dep.descriptor.key, dep.root);
        }
        if collab.materializer.is_some() {
            let scheduler = scheduler_for(&plan, &settings, collab.fs.clone());
            println!("      materialization due: {}", scheduler.is_due());
        }
    }

    debug!("dry-run complete (nothing watched)");
}
