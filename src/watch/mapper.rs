// src/watch/mapper.rs

//! Source path → deployment path mapping.
//!
//! Two source layouts feed one deployment layout:
//!
//! | source                                   | target                                   |
//! |------------------------------------------|------------------------------------------|
//! | `<source_root>/src/main/webapp/<rel>`    | `<deployment_root>/<rel>`                |
//! | `<source_root>/target/classes/<rel>`     | `<deployment_root>/WEB-INF/classes/<rel>`|
//!
//! Anything else is not mapped. Prefixes are matched per path component, so
//! `src/main/webapp2/x` is not under `src/main/webapp`.

use std::path::{Path, PathBuf};

const WEBAPP_DIR: [&str; 3] = ["src", "main", "webapp"];
const CLASSES_DIR: [&str; 2] = ["target", "classes"];
const DEPLOYED_CLASSES_DIR: [&str; 2] = ["WEB-INF", "classes"];

/// Map a changed file or directory to its deployment target.
///
/// Pure: the filesystem is never consulted, so directories and files map the
/// same way.
pub fn map_to_target(path: &Path, source_root: &Path, deployment_root: &Path) -> Option<PathBuf> {
    if let Ok(rel) = path.strip_prefix(webapp_dir(source_root)) {
        return Some(join_relative(deployment_root.to_path_buf(), rel));
    }

    if let Ok(rel) = path.strip_prefix(classes_dir(source_root)) {
        let mut target = deployment_root.to_path_buf();
        target.extend(DEPLOYED_CLASSES_DIR);
        return Some(join_relative(target, rel));
    }

    None
}

/// `<source_root>/src/main/webapp`
pub fn webapp_dir(source_root: &Path) -> PathBuf {
    let mut dir = source_root.to_path_buf();
    dir.extend(WEBAPP_DIR);
    dir
}

/// `<source_root>/target/classes`
pub fn classes_dir(source_root: &Path) -> PathBuf {
    let mut dir = source_root.to_path_buf();
    dir.extend(CLASSES_DIR);
    dir
}

fn join_relative(mut base: PathBuf, rel: &Path) -> PathBuf {
    if !rel.as_os_str().is_empty() {
        base.push(rel);
    }
    base
}
