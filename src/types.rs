use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// When the startup library materialization runs.
///
/// - `Blocking`: `Engine::start` waits for the materialization before the
///   watcher goes live (the deployment never serves stale libraries).
/// - `Background`: the materialization is spawned and the engine starts
///   watching immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterializeMode {
    Blocking,
    Background,
}

impl Default for MaterializeMode {
    fn default() -> Self {
        MaterializeMode::Blocking
    }
}

impl FromStr for MaterializeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blocking" => Ok(MaterializeMode::Blocking),
            "background" => Ok(MaterializeMode::Background),
            other => Err(format!(
                "invalid materialize_mode: {other} (expected \"blocking\" or \"background\")"
            )),
        }
    }
}

/// Lifecycle of one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Initializing,
    Watching,
    ShuttingDown,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Initializing => "initializing",
            EngineState::Watching => "watching",
            EngineState::ShuttingDown => "shutting-down",
        };
        f.write_str(s)
    }
}
