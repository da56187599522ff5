// src/config/validate.rs

use globset::Glob;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DeploySyncError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DeploySyncError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.materialize))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_roots(cfg)?;
    validate_timing(cfg)?;
    validate_ignore_patterns(cfg)?;
    validate_materialize(cfg)?;
    Ok(())
}

fn validate_roots(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.deployments_root.as_os_str().is_empty() {
        return Err(DeploySyncError::ConfigError(
            "[config].deployments_root must be set".to_string(),
        ));
    }
    if cfg.config.default_root.trim().is_empty() {
        return Err(DeploySyncError::ConfigError(
            "[config].default_root must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_timing(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.debounce_ms == 0 {
        return Err(DeploySyncError::ConfigError(
            "[config].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_ignore_patterns(cfg: &RawConfigFile) -> Result<()> {
    for pattern in &cfg.config.ignore {
        if let Err(err) = Glob::new(pattern) {
            return Err(DeploySyncError::ConfigError(format!(
                "invalid ignore pattern '{}': {}",
                pattern, err
            )));
        }
    }
    Ok(())
}

fn validate_materialize(cfg: &RawConfigFile) -> Result<()> {
    let section = &cfg.materialize;
    if !section.enabled {
        return Ok(());
    }

    if section.cmd.trim().is_empty() {
        return Err(DeploySyncError::ConfigError(
            "[materialize].cmd must not be empty when materialization is enabled".to_string(),
        ));
    }

    if let Some(pattern) = &section.failure_pattern {
        if let Err(err) = Regex::new(pattern) {
            return Err(DeploySyncError::ConfigError(format!(
                "invalid [materialize].failure_pattern '{}': {}",
                pattern, err
            )));
        }
    }
    Ok(())
}
