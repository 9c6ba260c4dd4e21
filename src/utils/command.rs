//! Utilities for running commands with proper error handling and timeouts

use anyhow::{Context, Result};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error};

/// A fully described subprocess call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment variables, never logged
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Program and arguments as one line, for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Run a command with optional timeout
///
/// A nonzero exit status is an error carrying the captured stderr. On timeout
/// the child process is killed.
pub async fn run_command(invocation: &Invocation, timeout: Option<Duration>) -> Result<Output> {
    let program = which::which(&invocation.program).with_context(|| {
        format!(
            "{} executable not found in PATH. Please ensure it is installed and in your PATH.",
            invocation.program
        )
    })?;

    let mut cmd = Command::new(&program);
    cmd.args(&invocation.args);
    cmd.envs(invocation.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    debug!("Running command: {}", invocation.command_line());

    let output = if let Some(timeout_duration) = timeout {
        match tokio::time::timeout(timeout_duration, cmd.output()).await {
            Ok(output) => output.context(format!("Failed to execute {}", invocation.program))?,
            Err(_) => anyhow::bail!("Command timed out after {:?}", timeout_duration),
        }
    } else {
        cmd.output()
            .await
            .context(format!("Failed to execute {}", invocation.program))?
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("Command failed: {}", invocation.command_line());
        error!("Stderr: {}", stderr.trim_end());
        anyhow::bail!(
            "Command failed with exit code {:?}: {}",
            output.status.code(),
            stderr.trim_end()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.is_empty() {
        debug!("Command output: {}", stdout);
    }

    Ok(output)
}
