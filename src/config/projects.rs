// src/config/projects.rs

//! Which project source roots this process manages.
//!
//! Sources, in order:
//! 1. the projects file (one path per line, `#` comments), if it exists;
//! 2. otherwise a path derived from the agent name;
//! 3. `--project` paths from the command line, appended to either.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::ConfigFile;
use crate::errors::{DeploySyncError, Result};
use crate::fs::FileSystem;
use crate::project::project_path_from_agent_name;

/// Parse the contents of a projects file.
///
/// Blank lines and lines starting with `#` are skipped; relative entries are
/// resolved against `base_dir`.
pub fn parse_projects_file(contents: &str, base_dir: &Path) -> Vec<PathBuf> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let path = PathBuf::from(line);
            if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            }
        })
        .collect()
}

/// Resolve the list of project source roots to manage.
///
/// `agent_override` replaces `[config].agent_name`. Duplicates are dropped,
/// keeping first occurrence order. An empty result is a configuration error.
pub fn resolve_project_paths(
    cfg: &ConfigFile,
    fs: &dyn FileSystem,
    cli_projects: &[String],
    agent_override: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let section = cfg.config_section();
    let projects_file = cfg.projects_file();

    let mut paths = if fs.is_file(&projects_file) {
        let contents = fs.read_to_string(&projects_file)?;
        let listed = parse_projects_file(&contents, cfg.base_dir());
        info!(file = ?projects_file, count = listed.len(), "read projects file");
        listed
    } else {
        debug!(file = ?projects_file, "no projects file; falling back to agent name");
        agent_override
            .or(section.agent_name.as_deref())
            .and_then(|name| project_path_from_agent_name(name, &section.agent_prefix))
            .into_iter()
            .collect()
    };

    paths.extend(cli_projects.iter().map(|p| cfg.resolve(Path::new(p))));

    let mut unique: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        if !unique.contains(&path) {
            unique.push(path);
        }
    }

    if unique.is_empty() {
        return Err(DeploySyncError::ConfigError(format!(
            "no projects to manage: {:?} does not exist, no agent name is configured and no --project was given",
            projects_file
        )));
    }
    Ok(unique)
}
