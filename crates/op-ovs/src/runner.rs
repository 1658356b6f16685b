//! Command execution for the OVS command-line tools
//!
//! Provides:
//! - [`CommandInvocation`]: one program plus its ordered argv
//! - [`CommandRunner`]: the seam every tool client executes through
//! - [`ProcessRunner`]: spawns the real process, with an optional timeout
//!
//! The runner never interprets tool output. It only checks the exit code and
//! hands stdout back to the caller.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{OvsError, Result};

/// A single external command: program, ordered arguments, and the exit code
/// that counts as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub expected_exit: i32,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            expected_exit: 0,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append an argument only when present
    pub fn opt_arg<S: Into<String>>(mut self, arg: Option<S>) -> Self {
        if let Some(arg) = arg {
            self.args.push(arg.into());
        }
        self
    }

    /// Append several arguments in order
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Shell-style rendering for logs
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// None if the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

/// Executes a [`CommandInvocation`] and returns its captured output.
///
/// Implementations must return `Err` whenever the process did not exit with
/// `expected_exit`, so callers never see partial output from a failed run.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput>;
}

/// Spawns real OS processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the child and fail with [`OvsError::Timeout`] once `timeout` elapses
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput> {
        let program = invocation.program.as_str();
        debug!("Running: {}", invocation.display());

        let start = Instant::now();
        let mut child = Command::new(program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        let mut stdout_pipe = child.stdout.take().ok_or_else(|| OvsError::Spawn {
            program: program.to_string(),
            source: std::io::Error::new(ErrorKind::BrokenPipe, "stdout not captured"),
        })?;
        let mut stderr_pipe = child.stderr.take().ok_or_else(|| OvsError::Spawn {
            program: program.to_string(),
            source: std::io::Error::new(ErrorKind::BrokenPipe, "stderr not captured"),
        })?;

        let collect = async {
            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            let (out_read, err_read) = tokio::join!(
                stdout_pipe.read_to_end(&mut stdout),
                stderr_pipe.read_to_end(&mut stderr),
            );
            out_read?;
            err_read?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, stdout, stderr))
        };

        let finished = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, collect).await.ok(),
            None => Some(collect.await),
        };

        let Some(finished) = finished else {
            let limit = self.timeout.unwrap_or_default();
            warn!(
                "{} exceeded {:?}, killing pid {:?}",
                program,
                limit,
                child.id()
            );
            // kill() also waits, so the child is reaped before we return
            if let Err(e) = child.kill().await {
                warn!("Failed to kill {}: {}", program, e);
            }
            return Err(OvsError::Timeout {
                program: program.to_string(),
                timeout: limit,
            });
        };

        let (status, stdout, stderr) = finished.map_err(|e| OvsError::Spawn {
            program: program.to_string(),
            source: e,
        })?;

        let output = CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code(),
            duration: start.elapsed(),
        };

        if output.exit_code != Some(invocation.expected_exit) {
            warn!(
                "{} failed ({:?}): {}",
                invocation.display(),
                output.exit_code,
                output.stderr.trim()
            );
            return Err(OvsError::NonZeroExit {
                program: program.to_string(),
                code: output.exit_code,
                stderr: output.stderr,
            });
        }

        if !output.stderr.trim().is_empty() {
            debug!("{} stderr: {}", program, output.stderr.trim());
        }

        Ok(output)
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> OvsError {
    if e.kind() == ErrorKind::NotFound {
        OvsError::ExecutableNotFound {
            program: program.to_string(),
        }
    } else {
        OvsError::Spawn {
            program: program.to_string(),
            source: e,
        }
    }
}

/// One OVS binary bound to the runner that executes it.
///
/// The tool clients build their argv through [`ToolBinary::command`] and pick
/// the accessor matching what the operation returns.
#[derive(Clone)]
pub(crate) struct ToolBinary {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl ToolBinary {
    pub(crate) fn new(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    pub(crate) fn program(&self) -> &str {
        &self.program
    }

    /// Start an invocation of this binary with the given subcommand
    pub(crate) fn command(&self, subcommand: &str) -> CommandInvocation {
        CommandInvocation::new(self.program.as_str()).arg(subcommand)
    }

    pub(crate) async fn stdout(&self, invocation: CommandInvocation) -> Result<String> {
        Ok(self.runner.run(&invocation).await?.stdout)
    }

    pub(crate) async fn lines(&self, invocation: CommandInvocation) -> Result<Vec<String>> {
        Ok(non_empty_lines(&self.stdout(invocation).await?))
    }

    pub(crate) async fn trimmed(&self, invocation: CommandInvocation) -> Result<String> {
        Ok(self.stdout(invocation).await?.trim().to_string())
    }

    pub(crate) async fn status(&self, invocation: CommandInvocation) -> Result<()> {
        self.runner.run(&invocation).await.map(|_| ())
    }
}

/// Split tool output into its non-empty lines, keeping order
pub fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
