// src/project/descriptor.rs

//! The narrow project model the engine consumes.
//!
//! Build-file formats are parsed by a [`BuildModelProvider`]; the engine only
//! ever sees a [`ProjectDescriptor`].

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

/// Identifier of a project: an optional namespace plus a bare name
/// (`group:artifact` for Maven).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ProjectKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Build a key, dropping namespaces that still contain unresolved
    /// `${...}` placeholders.
    pub fn qualified(namespace: Option<&str>, name: impl Into<String>) -> Self {
        let namespace = namespace
            .map(str::trim)
            .filter(|ns| !ns.is_empty() && !ns.contains("${"))
            .map(str::to_string);
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// Parse `"namespace:name"` or a bare `"name"`.
    pub fn parse(s: &str) -> Self {
        match s.trim().split_once(':') {
            Some((ns, name)) => Self::qualified(Some(ns), name.trim()),
            None => Self::new(s.trim()),
        }
    }

    /// Namespace-qualified comparison when both sides carry a namespace,
    /// name-only otherwise.
    pub fn matches(&self, other: &ProjectKey) -> bool {
        if self.name != other.name {
            return false;
        }
        match (&self.namespace, &other.namespace) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}:{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Read-only description of one project, valid for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub key: ProjectKey,
    /// Configured packaging name (e.g. `warName`), if any.
    pub packaging_name: Option<String>,
    pub dependencies: BTreeSet<ProjectKey>,
    /// Declared sub-module paths, relative to `root`, in declaration order.
    pub modules: Vec<PathBuf>,
    pub root: PathBuf,
}

impl ProjectDescriptor {
    /// Name of the deployment this project is served under.
    pub fn deployment_name(&self) -> &str {
        self.packaging_name.as_deref().unwrap_or(&self.key.name)
    }

    pub fn has_modules(&self) -> bool {
        !self.modules.is_empty()
    }

    /// True if any declared dependency matches `key`.
    pub fn depends_on(&self, key: &ProjectKey) -> bool {
        self.dependencies.iter().any(|dep| dep.matches(key))
    }
}

/// Supplies project descriptors for directories.
pub trait BuildModelProvider: Send + Sync + fmt::Debug {
    /// Path of the build descriptor file that would describe `dir`.
    fn descriptor_path(&self, dir: &Path) -> PathBuf;

    /// Load the descriptor of `dir`.
    ///
    /// `Ok(None)` means there is no build descriptor there, which is a normal
    /// outcome. `Err` means a descriptor exists but could not be read.
    fn load(&self, dir: &Path) -> Result<Option<ProjectDescriptor>>;
}
