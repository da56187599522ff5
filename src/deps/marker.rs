// src/deps/marker.rs

//! Persisted "last successful materialization" timestamp.
//!
//! One file per deployment:
//!
//! `<marker_dir>/<deployment>.marker`
//!
//! holding the completion time as nanoseconds since the UNIX epoch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};

use crate::fs::FileSystem;

pub const MARKER_EXTENSION: &str = "marker";

#[derive(Debug, Clone)]
pub struct MarkerStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl MarkerStore {
    pub fn new(marker_dir: &Path, deployment: &str, fs: Arc<dyn FileSystem>) -> Self {
        let file_name = format!("{}.{MARKER_EXTENSION}", sanitize(deployment));
        Self {
            path: marker_dir.join(file_name),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the recorded time.
    ///
    /// `Ok(None)` if the marker is missing or empty; `Err` if it exists but
    /// cannot be read or parsed.
    pub fn load(&self) -> Result<Option<SystemTime>> {
        if !self.fs.exists(&self.path) {
            return Ok(None);
        }
        let text = self.fs.read_to_string(&self.path)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let nanos: u64 = trimmed
            .parse()
            .map_err(|err| anyhow!("invalid marker contents {:?}: {err}", trimmed))?;
        Ok(Some(UNIX_EPOCH + Duration::from_nanos(nanos)))
    }

    pub fn store(&self, time: SystemTime) -> Result<()> {
        let since_epoch = time
            .duration_since(UNIX_EPOCH)
            .context("marker time before UNIX epoch")?;
        let nanos = u64::try_from(since_epoch.as_nanos()).context("marker time out of range")?;
        self.fs
            .write(&self.path, format!("{nanos}\n").as_bytes())
            .with_context(|| format!("writing marker {:?}", self.path))
    }

    pub fn clear(&self) -> Result<()> {
        self.fs
            .remove(&self.path)
            .map(|_| ())
            .with_context(|| format!("removing marker {:?}", self.path))
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}
