// src/project/discovery.rs

//! Discovery of sibling workspace projects the primary project depends on.
//!
//! Starting at the primary project's parent directory, each ancestor that has
//! a build descriptor is examined: its declared sub-modules are expanded
//! recursively, and every leaf module whose identifier is one of the primary
//! project's dependencies is reported. The walk stops at the first ancestor
//! without a descriptor.
//!
//! Matching is done on [`ProjectKey`]s, so two unrelated projects that share
//! a bare name (and lack a resolvable namespace) are indistinguishable.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::project::descriptor::{BuildModelProvider, ProjectDescriptor};
use crate::watch::path_utils::normalize_lexically;

/// A sibling project to be watched as a dependency project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyProject {
    pub root: PathBuf,
    pub descriptor: ProjectDescriptor,
}

/// Find every dependency project of `primary` in its enclosing workspace.
///
/// The result is ordered by root path and free of duplicates, so repeated
/// runs against an unchanged workspace return the same list.
pub fn discover_dependency_projects(
    primary: &ProjectDescriptor,
    provider: &dyn BuildModelProvider,
) -> Vec<DependencyProject> {
    if primary.dependencies.is_empty() {
        return Vec::new();
    }

    let mut walk = DiscoveryWalk {
        primary,
        provider,
        found: BTreeMap::new(),
        expanded: HashSet::new(),
    };

    let primary_root = normalize_lexically(&primary.root);
    let mut current = primary_root.parent().map(Path::to_path_buf);

    while let Some(dir) = current {
        let Some(level) = load_quietly(provider, &dir) else {
            debug!(dir = ?dir, "no build descriptor; workspace walk stops here");
            break;
        };
        debug!(dir = ?dir, project = %level.key, "examining workspace level");
        walk.examine_modules(&level);
        current = dir.parent().map(Path::to_path_buf);
    }

    walk.found.into_values().collect()
}

struct DiscoveryWalk<'a> {
    primary: &'a ProjectDescriptor,
    provider: &'a dyn BuildModelProvider,
    found: BTreeMap<PathBuf, DependencyProject>,
    /// Aggregator directories already expanded (shared ancestors, cycles).
    expanded: HashSet<PathBuf>,
}

impl DiscoveryWalk<'_> {
    fn examine_modules(&mut self, level: &ProjectDescriptor) {
        let level_root = normalize_lexically(&level.root);
        if !self.expanded.insert(level_root.clone()) {
            return;
        }

        let primary_root = normalize_lexically(&self.primary.root);
        for module in &level.modules {
            let module_root = normalize_lexically(&level_root.join(module));
            if module_root == primary_root {
                continue;
            }

            let Some(module_desc) = load_quietly(self.provider, &module_root) else {
                continue;
            };

            if module_desc.has_modules() {
                self.examine_modules(&module_desc);
            } else if self.primary.depends_on(&module_desc.key) {
                debug!(
                    project = %module_desc.key,
                    root = ?module_root,
                    "found dependency project in workspace"
                );
                self.found.insert(
                    module_root.clone(),
                    DependencyProject {
                        root: module_root,
                        descriptor: module_desc,
                    },
                );
            }
        }
    }
}

/// Load a descriptor, treating read/parse failures as "absent".
fn load_quietly(provider: &dyn BuildModelProvider, dir: &Path) -> Option<ProjectDescriptor> {
    match provider.load(dir) {
        Ok(desc) => desc,
        Err(err) => {
            warn!(dir = ?dir, error = %err, "unreadable build descriptor; skipping branch");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};

    use crate::project::descriptor::ProjectKey;

    #[derive(Debug, Default)]
    struct Workspace {
        projects: HashMap<PathBuf, ProjectDescriptor>,
        broken: HashSet<PathBuf>,
        loads: Mutex<Vec<PathBuf>>,
    }

    impl Workspace {
        fn add(&mut self, root: &str, key: &str, modules: &[&str], deps: &[&str]) {
            let root = PathBuf::from(root);
            self.projects.insert(
                root.clone(),
                ProjectDescriptor {
                    key: ProjectKey::parse(key),
                    packaging_name: None,
                    dependencies: deps.iter().map(|d| ProjectKey::parse(d)).collect::<BTreeSet<_>>(),
                    modules: modules.iter().map(PathBuf::from).collect(),
                    root,
                },
            );
        }

        fn primary(&self, root: &str) -> ProjectDescriptor {
            self.projects[Path::new(root)].clone()
        }
    }

    impl BuildModelProvider for Workspace {
        fn descriptor_path(&self, dir: &Path) -> PathBuf {
            dir.join("pom.xml")
        }

        fn load(&self, dir: &Path) -> Result<Option<ProjectDescriptor>> {
            self.loads.lock().unwrap().push(dir.to_path_buf());
            if self.broken.contains(dir) {
                return Err(anyhow!("broken descriptor"));
            }
            Ok(self.projects.get(dir).cloned())
        }
    }

    fn roots(found: &[DependencyProject]) -> Vec<PathBuf> {
        found.iter().map(|d| d.root.clone()).collect()
    }

    #[test]
    fn leaf_module_matching_dependency_is_found_once() {
        let mut ws = Workspace::default();
        ws.add("/ws/foo", "com.foo:parent", &["a", "b", "bar"], &[]);
        ws.add("/ws/foo/a", "com.foo:a", &[], &[]);
        ws.add("/ws/foo/b", "com.foo:b", &[], &[]);
        ws.add("/ws/foo/bar", "com.foo:bar", &[], &["com.foo:a"]);

        let found = discover_dependency_projects(&ws.primary("/ws/foo/bar"), &ws);
        assert_eq!(roots(&found), vec![PathBuf::from("/ws/foo/a")]);
    }

    #[test]
    fn aggregator_modules_are_expanded_not_tested() {
        let mut ws = Workspace::default();
        ws.add("/ws", "com.foo:root", &["libs", "app"], &[]);
        // "libs" itself matches a dependency name but is an aggregator.
        ws.add("/ws/libs", "com.foo:libs", &["core", "../shared"], &[]);
        ws.add("/ws/libs/core", "com.foo:core", &[], &[]);
        ws.add("/ws/shared", "com.foo:shared", &[], &[]);
        ws.add(
            "/ws/app",
            "com.foo:app",
            &[],
            &["com.foo:core", "com.foo:shared", "com.foo:libs"],
        );

        let found = discover_dependency_projects(&ws.primary("/ws/app"), &ws);
        assert_eq!(
            roots(&found),
            vec![PathBuf::from("/ws/libs/core"), PathBuf::from("/ws/shared")]
        );
    }

    #[test]
    fn walk_stops_at_first_ancestor_without_descriptor() {
        let mut ws = Workspace::default();
        // "/top" has a matching module, but "/top/gap" has no descriptor.
        ws.add("/top", "com.foo:top", &["dep"], &[]);
        ws.add("/top/dep", "com.foo:dep", &[], &[]);
        ws.add("/top/gap/app", "com.foo:app", &[], &["com.foo:dep"]);

        let found = discover_dependency_projects(&ws.primary("/top/gap/app"), &ws);
        assert!(found.is_empty());
    }

    #[test]
    fn unreadable_module_only_drops_its_branch() {
        let mut ws = Workspace::default();
        ws.add("/ws", "com.foo:root", &["broken", "ok", "app"], &[]);
        ws.add("/ws/ok", "com.foo:ok", &[], &[]);
        ws.add("/ws/app", "com.foo:app", &[], &["com.foo:ok", "com.foo:broken"]);
        ws.broken.insert(PathBuf::from("/ws/broken"));

        let found = discover_dependency_projects(&ws.primary("/ws/app"), &ws);
        assert_eq!(roots(&found), vec![PathBuf::from("/ws/ok")]);
    }

    #[test]
    fn namespace_mismatch_is_not_a_dependency() {
        let mut ws = Workspace::default();
        ws.add("/ws", "com.foo:root", &["util", "app"], &[]);
        ws.add("/ws/util", "org.other:util", &[], &[]);
        ws.add("/ws/app", "com.foo:app", &[], &["com.foo:util"]);

        assert!(discover_dependency_projects(&ws.primary("/ws/app"), &ws).is_empty());
    }

    #[test]
    fn discovery_is_idempotent_across_nested_levels() {
        let mut ws = Workspace::default();
        ws.add("/ws", "com.foo:root", &["group"], &[]);
        ws.add("/ws/group", "com.foo:group", &["a", "app"], &[]);
        ws.add("/ws/group/a", "com.foo:a", &[], &[]);
        ws.add("/ws/group/app", "com.foo:app", &[], &["com.foo:a"]);

        let primary = ws.primary("/ws/group/app");
        let first = discover_dependency_projects(&primary, &ws);
        let second = discover_dependency_projects(&primary, &ws);
        assert_eq!(roots(&first), vec![PathBuf::from("/ws/group/a")]);
        assert_eq!(first, second);
    }

    #[test]
    fn no_dependencies_means_no_walk() {
        let mut ws = Workspace::default();
        ws.add("/ws", "com.foo:root", &["app"], &[]);
        ws.add("/ws/app", "com.foo:app", &[], &[]);

        assert!(discover_dependency_projects(&ws.primary("/ws/app"), &ws).is_empty());
        assert!(ws.loads.lock().unwrap().is_empty());
    }
}
