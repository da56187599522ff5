// src/project/mod.rs

//! Project model consumed by the engine.
//!
//! - [`descriptor`]: the narrow [`ProjectDescriptor`] and the
//!   [`BuildModelProvider`] seam.
//! - [`pom`]: the `pom.xml` implementation of that seam.
//! - [`deployment`]: managed projects and deployment directory resolution.
//! - [`discovery`]: dependency projects within the enclosing workspace.

pub mod deployment;
pub mod descriptor;
pub mod discovery;
pub mod pom;

pub use deployment::{project_path_from_agent_name, resolve_deployment_root, ManagedProject};
pub use descriptor::{BuildModelProvider, ProjectDescriptor, ProjectKey};
pub use discovery::{discover_dependency_projects, DependencyProject};
pub use pom::{PomModelProvider, POM_FILE};
