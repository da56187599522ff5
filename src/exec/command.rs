// src/exec/command.rs

//! Materialization through an external shell command.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::exec::backend::{MaterializationRequest, Materializer};

/// Placeholder replaced by the project source root.
pub const PROJECT_PLACEHOLDER: &str = "{project}";
/// Placeholder replaced by the library output directory.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Runs a command template such as
/// `mvn -q dependency:copy-dependencies -DoutputDirectory={output}` in the
/// project root.
///
/// The run fails if the command exits non-zero or if a line of its stdout
/// matches `failure_pattern`.
#[derive(Debug, Clone)]
pub struct CommandMaterializer {
    template: String,
    failure_pattern: Option<Regex>,
}

impl CommandMaterializer {
    pub fn new(template: impl Into<String>, failure_pattern: Option<Regex>) -> Self {
        Self {
            template: template.into(),
            failure_pattern,
        }
    }

    /// The command line for `request`, placeholders substituted.
    pub fn render(&self, request: &MaterializationRequest) -> String {
        self.template
            .replace(PROJECT_PLACEHOLDER, &request.project_root.to_string_lossy())
            .replace(OUTPUT_PLACEHOLDER, &request.output_dir.to_string_lossy())
    }

    async fn run(&self, request: &MaterializationRequest) -> Result<()> {
        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .with_context(|| format!("creating library directory {:?}", request.output_dir))?;

        let line = self.render(request);
        info!(cmd = %line, cwd = ?request.project_root, "running materialization command");

        let mut cmd = shell_command(&line);
        cmd.current_dir(&request.project_root)
            .env("DEPLOYSYNC_PROJECT_ROOT", &request.project_root)
            .env("DEPLOYSYNC_OUTPUT_DIR", &request.output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning materialization command '{line}'"))?;

        // Always consume stderr so buffers don't fill; log at debug.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("materialize stderr: {}", line);
                }
            });
        }

        let mut failure_line = None;
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines
                .next_line()
                .await
                .context("reading materialization output")?
            {
                debug!("materialize stdout: {}", line);
                if failure_line.is_none()
                    && self.failure_pattern.as_ref().is_some_and(|re| re.is_match(&line))
                {
                    failure_line = Some(line);
                }
            }
        }

        let status = child
            .wait()
            .await
            .context("waiting for materialization command")?;

        if !status.success() {
            bail!(
                "materialization command exited with code {}",
                status.code().unwrap_or(-1)
            );
        }
        if let Some(line) = failure_line {
            bail!("materialization output reported failure: {line}");
        }
        Ok(())
    }
}

impl Materializer for CommandMaterializer {
    fn materialize<'a>(
        &'a self,
        request: &'a MaterializationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.run(request))
    }
}

fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}
