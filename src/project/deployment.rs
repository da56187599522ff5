// src/project/deployment.rs

//! Mapping between projects and deployment directories.

use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use tracing::warn;

use crate::fs::FileSystem;

/// A source tree mirrored into one deployment tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedProject {
    pub deployment_name: String,
    pub source_root: PathBuf,
    pub deployment_root: PathBuf,
}

impl ManagedProject {
    /// Directory the materialized third-party libraries are written to.
    pub fn library_dir(&self) -> PathBuf {
        self.deployment_root.join("WEB-INF").join("lib")
    }
}

/// Resolve `<deployments_root>/<deployment_name>`, falling back to
/// `<deployments_root>/<default_root>` when that directory does not exist.
pub fn resolve_deployment_root(
    fs: &dyn FileSystem,
    deployments_root: &Path,
    deployment_name: &str,
    default_root: &str,
) -> PathBuf {
    let candidate = deployments_root.join(deployment_name);
    if fs.is_dir(&candidate) {
        return candidate;
    }

    let fallback = deployments_root.join(default_root);
    warn!(
        deployment = %deployment_name,
        expected = ?candidate,
        fallback = ?fallback,
        "deployment directory not found; using default root"
    );
    fallback
}

/// Derive a project source path from an agent deployment name.
///
/// `deploysync-home.me.workspace.shop` with prefix `deploysync-` becomes
/// `/home/me/workspace/shop`. Returns `None` if nothing is left after the
/// prefix is removed.
pub fn project_path_from_agent_name(agent_name: &str, prefix: &str) -> Option<PathBuf> {
    let trimmed = agent_name.trim().trim_start_matches('/');
    let rest = trimmed.strip_prefix(prefix).unwrap_or(trimmed);
    let segments: Vec<&str> = rest.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return None;
    }

    let mut path = PathBuf::from(MAIN_SEPARATOR_STR);
    for segment in segments {
        path.push(segment);
    }
    Some(path)
}
