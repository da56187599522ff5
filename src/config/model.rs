// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::MaterializeMode;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// deployments_root = "/opt/tomcat/webapps"
/// default_root = "ROOT"
/// projects_file = "projects.txt"
/// marker_dir = ".deploysync/markers"
/// materialize_mode = "blocking"
/// debounce_ms = 1500
/// ignore = ["**/*.swp"]
///
/// [materialize]
/// cmd = "mvn -q dependency:copy-dependencies -DoutputDirectory={output}"
/// failure_pattern = "BUILD FAILURE"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub materialize: MaterializeSection,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory holding the exploded deployments (e.g. Tomcat `webapps`).
    #[serde(default)]
    pub deployments_root: PathBuf,

    /// Deployment used when a project's own deployment directory is missing.
    #[serde(default = "default_default_root")]
    pub default_root: String,

    /// Plain-text list of project source roots, one per line.
    ///
    /// Optional; a missing file is not an error.
    #[serde(default = "default_projects_file")]
    pub projects_file: PathBuf,

    /// Deployment name of the agent, used to derive a single project path
    /// when the projects file does not exist.
    #[serde(default)]
    pub agent_name: Option<String>,

    /// Prefix stripped from `agent_name` before deriving the project path.
    #[serde(default = "default_agent_prefix")]
    pub agent_prefix: String,

    /// Where the per-deployment materialization markers are kept.
    #[serde(default = "default_marker_dir")]
    pub marker_dir: PathBuf,

    #[serde(default)]
    pub materialize_mode: MaterializeMode,

    /// Quiet period after a build descriptor change before libraries are
    /// re-materialized.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Glob patterns (relative to a project root) whose changes are never
    /// mirrored.
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_default_root() -> String {
    "ROOT".to_string()
}

fn default_projects_file() -> PathBuf {
    PathBuf::from("projects.txt")
}

fn default_agent_prefix() -> String {
    "deploysync-".to_string()
}

fn default_marker_dir() -> PathBuf {
    PathBuf::from(".deploysync/markers")
}

fn default_debounce_ms() -> u64 {
    1500
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            deployments_root: PathBuf::new(),
            default_root: default_default_root(),
            projects_file: default_projects_file(),
            agent_name: None,
            agent_prefix: default_agent_prefix(),
            marker_dir: default_marker_dir(),
            materialize_mode: MaterializeMode::default(),
            debounce_ms: default_debounce_ms(),
            ignore: Vec::new(),
        }
    }
}

/// `[materialize]` section: the external library materialization command.
#[derive(Debug, Clone, Deserialize)]
pub struct MaterializeSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Shell command template; `{project}` and `{output}` are substituted.
    #[serde(default = "default_materialize_cmd")]
    pub cmd: String,

    /// Regex matched against each stdout line; a match fails the run even
    /// if the command exits successfully.
    #[serde(default = "default_failure_pattern")]
    pub failure_pattern: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_materialize_cmd() -> String {
    "mvn -q dependency:copy-dependencies -DoutputDirectory={output}".to_string()
}

fn default_failure_pattern() -> Option<String> {
    Some("BUILD FAILURE".to_string())
}

impl Default for MaterializeSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            cmd: default_materialize_cmd(),
            failure_pattern: default_failure_pattern(),
        }
    }
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`).
/// Relative paths are resolved against `base_dir`, the directory of the
/// config file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    materialize: MaterializeSection,
    base_dir: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, materialize: MaterializeSection) -> Self {
        Self {
            config,
            materialize,
            base_dir: PathBuf::from("."),
        }
    }

    /// Resolve relative paths against `dir` from now on.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn materialize_section(&self) -> &MaterializeSection {
        &self.materialize
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn deployments_root(&self) -> PathBuf {
        self.resolve(&self.config.deployments_root)
    }

    pub fn marker_dir(&self) -> PathBuf {
        self.resolve(&self.config.marker_dir)
    }

    pub fn projects_file(&self) -> PathBuf {
        self.resolve(&self.config.projects_file)
    }

    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.config.debounce_ms)
    }
}
