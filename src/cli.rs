// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "deploysync",
    version,
    about = "Mirror project source and build output changes into running deployments.",
    long_about = None
)]
pub struct CliArgs {
    /// TOML config file; relative paths inside it resolve against its
    /// directory.
    #[arg(long, value_name = "PATH", default_value = "Deploysync.toml")]
    pub config: String,

    /// Additional project source root to manage (repeatable).
    ///
    /// Added on top of the projects file / agent name configured in the
    /// config file.
    #[arg(long = "project", value_name = "PATH")]
    pub projects: Vec<String>,

    /// Override `config.agent_name`, used to derive a project path when no
    /// projects file exists.
    #[arg(long, value_name = "NAME")]
    pub agent_name: Option<String>,

    /// Log level; overrides `DEPLOYSYNC_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve projects, deployments and dependency projects, print them and
    /// exit without watching anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The equivalent `EnvFilter` directive.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
