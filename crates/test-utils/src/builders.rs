#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use deploysync::project::{BuildModelProvider, ProjectDescriptor, ProjectKey};

/// Builder for `ProjectDescriptor` to simplify test setup.
pub struct DescriptorBuilder {
    descriptor: ProjectDescriptor,
}

impl DescriptorBuilder {
    /// `key` is `"group:artifact"` or a bare `"artifact"`.
    pub fn new(key: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            descriptor: ProjectDescriptor {
                key: ProjectKey::parse(key),
                packaging_name: None,
                dependencies: BTreeSet::new(),
                modules: Vec::new(),
                root: root.into(),
            },
        }
    }

    pub fn depends_on(mut self, key: &str) -> Self {
        self.descriptor.dependencies.insert(ProjectKey::parse(key));
        self
    }

    pub fn module(mut self, path: &str) -> Self {
        self.descriptor.modules.push(PathBuf::from(path));
        self
    }

    pub fn packaging_name(mut self, name: &str) -> Self {
        self.descriptor.packaging_name = Some(name.to_string());
        self
    }

    pub fn build(self) -> ProjectDescriptor {
        self.descriptor
    }
}

/// Build model served from memory, keyed by project root.
#[derive(Debug, Clone, Default)]
pub struct InMemoryModel {
    projects: Arc<Mutex<HashMap<PathBuf, ProjectDescriptor>>>,
}

impl InMemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, descriptor: ProjectDescriptor) -> Self {
        self.add(descriptor);
        self
    }

    pub fn add(&self, descriptor: ProjectDescriptor) {
        self.projects
            .lock()
            .unwrap()
            .insert(descriptor.root.clone(), descriptor);
    }
}

impl BuildModelProvider for InMemoryModel {
    fn descriptor_path(&self, dir: &Path) -> PathBuf {
        dir.join("pom.xml")
    }

    fn load(&self, dir: &Path) -> Result<Option<ProjectDescriptor>> {
        Ok(self.projects.lock().unwrap().get(dir).cloned())
    }
}

/// Minimal `pom.xml` text for tests running against the real filesystem.
pub struct PomBuilder {
    group: String,
    artifact: String,
    war_name: Option<String>,
    dependencies: Vec<(String, String)>,
    modules: Vec<String>,
}

impl PomBuilder {
    pub fn new(group: &str, artifact: &str) -> Self {
        Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            war_name: None,
            dependencies: Vec::new(),
            modules: Vec::new(),
        }
    }

    pub fn dependency(mut self, group: &str, artifact: &str) -> Self {
        self.dependencies.push((group.to_string(), artifact.to_string()));
        self
    }

    pub fn module(mut self, path: &str) -> Self {
        self.modules.push(path.to_string());
        self
    }

    pub fn war_name(mut self, name: &str) -> Self {
        self.war_name = Some(name.to_string());
        self
    }

    pub fn build(self) -> String {
        let mut xml = String::from("<project xmlns=\"http://maven.apache.org/POM/4.0.0\">\n");
        xml.push_str(&format!("  <groupId>{}</groupId>\n", self.group));
        xml.push_str(&format!("  <artifactId>{}</artifactId>\n", self.artifact));

        if !self.modules.is_empty() {
            xml.push_str("  <modules>\n");
            for module in &self.modules {
                xml.push_str(&format!("    <module>{module}</module>\n"));
            }
            xml.push_str("  </modules>\n");
        }

        if !self.dependencies.is_empty() {
            xml.push_str("  <dependencies>\n");
            for (group, artifact) in &self.dependencies {
                xml.push_str(&format!(
                    "    <dependency><groupId>{group}</groupId><artifactId>{artifact}</artifactId></dependency>\n"
                ));
            }
            xml.push_str("  </dependencies>\n");
        }

        if let Some(war_name) = &self.war_name {
            xml.push_str(&format!(
                "  <build><plugins><plugin><artifactId>maven-war-plugin</artifactId><configuration><warName>{war_name}</warName></configuration></plugin></plugins></build>\n"
            ));
        }

        xml.push_str("</project>\n");
        xml
    }
}
