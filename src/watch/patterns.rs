// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::watch::path_utils::relative_str;

/// Compiled `[config].ignore` patterns.
///
/// Patterns are relative to a project source root; the dispatch loop passes
/// changed paths in and skips deployment effects for matches.
#[derive(Clone)]
pub struct IgnoreSet {
    patterns: Vec<String>,
    set: Option<GlobSet>,
}

impl fmt::Debug for IgnoreSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl IgnoreSet {
    /// Ignore nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: None,
        }
    }

    pub fn new(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::empty());
        }
        let set = build_globset(patterns).context("building ignore globset")?;
        Ok(Self {
            patterns: patterns.to_vec(),
            set: Some(set),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_none()
    }

    /// True if `path`, taken relative to `source_root`, matches a pattern.
    ///
    /// Paths outside `source_root` never match.
    pub fn is_ignored(&self, source_root: &Path, path: &Path) -> bool {
        let Some(set) = &self.set else {
            return false;
        };
        match relative_str(source_root, path) {
            Some(rel) => set.is_match(rel.as_str()),
            None => false,
        }
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> IgnoreSet {
        let owned: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        IgnoreSet::new(&owned).unwrap()
    }

    #[test]
    fn matches_relative_to_source_root() {
        let ignore = set(&["**/*.swp", "src/main/webapp/tmp/**"]);
        let root = Path::new("/ws/app");

        assert!(ignore.is_ignored(root, Path::new("/ws/app/src/main/webapp/.index.html.swp")));
        assert!(ignore.is_ignored(root, Path::new("/ws/app/src/main/webapp/tmp/a/b.txt")));
        assert!(!ignore.is_ignored(root, Path::new("/ws/app/src/main/webapp/index.html")));
        assert!(!ignore.is_ignored(root, Path::new("/elsewhere/x.swp")));
    }

    #[test]
    fn empty_set_ignores_nothing() {
        let ignore = IgnoreSet::empty();
        assert!(ignore.is_empty());
        assert!(!ignore.is_ignored(Path::new("/ws"), Path::new("/ws/a.swp")));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(IgnoreSet::new(&["src/[".to_string()]).is_err());
    }
}
