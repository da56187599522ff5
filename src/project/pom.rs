// src/project/pom.rs

//! `pom.xml` backed [`BuildModelProvider`].
//!
//! Only the handful of elements the engine needs are read; property
//! interpolation is not performed, so values still containing `${...}` are
//! treated as unknown.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use xot::{Node, Xot};

use crate::fs::FileSystem;
use crate::project::descriptor::{BuildModelProvider, ProjectDescriptor, ProjectKey};

pub const POM_FILE: &str = "pom.xml";

const WAR_PLUGIN: &str = "maven-war-plugin";

#[derive(Debug, Clone)]
pub struct PomModelProvider {
    fs: Arc<dyn FileSystem>,
}

impl PomModelProvider {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl BuildModelProvider for PomModelProvider {
    fn descriptor_path(&self, dir: &Path) -> PathBuf {
        dir.join(POM_FILE)
    }

    fn load(&self, dir: &Path) -> Result<Option<ProjectDescriptor>> {
        let path = self.descriptor_path(dir);
        if !self.fs.is_file(&path) {
            return Ok(None);
        }
        let text = self.fs.read_to_string(&path)?;
        let descriptor = parse_pom(&text, dir)
            .with_context(|| format!("parsing build descriptor {:?}", path))?;
        Ok(Some(descriptor))
    }
}

/// Parse the contents of a `pom.xml` describing the project rooted at `root`.
pub fn parse_pom(xml: &str, root: &Path) -> Result<ProjectDescriptor> {
    let mut xot = Xot::new();
    let doc = xot
        .parse(xml)
        .map_err(|err| anyhow!("malformed XML: {err:?}"))?;
    let project = xot
        .document_element(doc)
        .map_err(|err| anyhow!("missing document element: {err:?}"))?;

    if local_name(&xot, project) != Some("project") {
        bail!("root element is not <project>");
    }

    let artifact =
        child_text(&xot, project, "artifactId").ok_or_else(|| anyhow!("missing <artifactId>"))?;

    // groupId is routinely inherited from <parent>.
    let group = child_text(&xot, project, "groupId").or_else(|| {
        child_named(&xot, project, "parent").and_then(|parent| child_text(&xot, parent, "groupId"))
    });

    let mut dependencies = BTreeSet::new();
    if let Some(deps) = child_named(&xot, project, "dependencies") {
        for dep in children_named(&xot, deps, "dependency") {
            if let Some(dep_artifact) = child_text(&xot, dep, "artifactId") {
                let dep_group = child_text(&xot, dep, "groupId");
                dependencies.insert(ProjectKey::qualified(dep_group.as_deref(), dep_artifact));
            }
        }
    }

    let modules = child_named(&xot, project, "modules")
        .map(|mods| {
            children_named(&xot, mods, "module")
                .filter_map(|m| text_of(&xot, m))
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(ProjectDescriptor {
        key: ProjectKey::qualified(group.as_deref(), artifact),
        packaging_name: packaging_name(&xot, project),
        dependencies,
        modules,
        root: root.to_path_buf(),
    })
}

/// `maven-war-plugin` `<warName>`, then `<build><finalName>`.
fn packaging_name(xot: &Xot, project: Node) -> Option<String> {
    let build = child_named(xot, project, "build")?;

    let war_name = child_named(xot, build, "plugins").and_then(|plugins| {
        children_named(xot, plugins, "plugin")
            .filter(|plugin| child_text(xot, *plugin, "artifactId").as_deref() == Some(WAR_PLUGIN))
            .find_map(|plugin| {
                child_named(xot, plugin, "configuration")
                    .and_then(|cfg| child_text(xot, cfg, "warName"))
            })
    });

    war_name
        .or_else(|| child_text(xot, build, "finalName"))
        .filter(|name| !name.contains("${"))
}

fn local_name(xot: &Xot, node: Node) -> Option<&str> {
    xot.element(node).map(|el| xot.local_name_str(el.name()))
}

fn children_named<'a>(xot: &'a Xot, node: Node, name: &'a str) -> impl Iterator<Item = Node> + 'a {
    xot.children(node)
        .filter(move |child| local_name(xot, *child) == Some(name))
}

fn child_named(xot: &Xot, node: Node, name: &str) -> Option<Node> {
    children_named(xot, node, name).next()
}

fn child_text(xot: &Xot, node: Node, name: &str) -> Option<String> {
    child_named(xot, node, name).and_then(|child| text_of(xot, child))
}

fn text_of(xot: &Xot, node: Node) -> Option<String> {
    xot.text_content_str(node)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
