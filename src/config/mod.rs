// src/config/mod.rs

//! Configuration: TOML model, loading, validation and the list of managed
//! projects.

pub mod loader;
pub mod model;
pub mod projects;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, MaterializeSection, RawConfigFile};
pub use projects::{parse_projects_file, resolve_project_paths};
