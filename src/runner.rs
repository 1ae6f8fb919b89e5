//! External command execution for the updater
//!
//! Every tool the updater drives (git, archive extractors, the package
//! installer, the process supervisor) goes through the same builder, so
//! timeout handling, output capture and error mapping live in exactly one
//! place. Components build a [`ToolCommand`], await it, and get either
//! captured output or a typed [`UpdateError`].

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::UpdateError;

/// Default time bound for external commands (5 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Builder for constructing and executing external commands with consistent
/// error handling.
///
/// # Examples
///
/// ```rust,no_run
/// use refit::runner::ToolCommand;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let output = ToolCommand::new("git")
///     .args(["status", "--porcelain"])
///     .current_dir(Path::new("/srv/app"))
///     .output()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
///
/// # Defaults
///
/// - **Timeout**: 5 minutes; raise it for slow steps like package installs
/// - **Output**: always captured; stdin is closed, commands must not prompt
/// - **Working directory**: inherited unless [`current_dir`](Self::current_dir) is set
pub struct ToolCommand {
    /// Program to invoke (looked up on PATH)
    program: String,

    /// Arguments passed to the program in order
    args: Vec<String>,

    /// Working directory for the child process
    current_dir: Option<std::path::PathBuf>,

    /// Environment variables set for the child process
    env_vars: Vec<(String, String)>,

    /// Maximum duration to wait for completion (None = unbounded)
    timeout_duration: Option<Duration>,
}

impl ToolCommand {
    /// Create a builder for `program` with default settings
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env_vars: Vec::new(),
            timeout_duration: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Set the working directory for the command
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Set a custom timeout (None for no timeout)
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Execute the command and return the captured output
    ///
    /// Non-zero exit maps to [`UpdateError::CommandFailed`] carrying stderr
    /// (or stdout when stderr is empty, or the exit status when both are);
    /// exceeding the time bound maps to [`UpdateError::CommandTimeout`].
    pub async fn output(self) -> Result<ToolOutput> {
        let start = std::time::Instant::now();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        tracing::debug!(
            target: "runner",
            "Executing command: {} {}",
            self.program,
            self.args.join(" ")
        );

        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        for (key, value) in &self.env_vars {
            tracing::trace!(target: "runner", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output_future = cmd.output();

        let output = if let Some(duration) = self.timeout_duration {
            if let Ok(result) = timeout(duration, output_future).await {
                result.with_context(|| {
                    format!("failed to execute {} {}", self.program, self.args.join(" "))
                })?
            } else {
                tracing::warn!(
                    target: "runner",
                    "Command timed out after {}s: {} {}",
                    duration.as_secs(),
                    self.program,
                    self.args.join(" ")
                );
                return Err(UpdateError::CommandTimeout {
                    program: self.program,
                    seconds: duration.as_secs(),
                }
                .into());
            }
        } else {
            output_future.await.with_context(|| {
                format!("failed to execute {} {}", self.program, self.args.join(" "))
            })?
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "runner",
                "Command failed with exit code {:?}: {} {}",
                output.status.code(),
                self.program,
                self.args.join(" ")
            );
            if !stderr.is_empty() {
                tracing::debug!(target: "runner", "stderr: {}", stderr.trim());
            }

            let message = if !stderr.trim().is_empty() {
                stderr.trim().to_string()
            } else if !stdout.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                format!("exited with {}", output.status)
            };
            return Err(UpdateError::CommandFailed {
                program: self.program,
                stderr: message,
            }
            .into());
        }

        if !stdout.is_empty() {
            tracing::trace!(target: "runner", "{}", stdout.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(
                target: "runner::perf",
                "{} took {:.2}s",
                self.program,
                elapsed.as_secs_f64()
            );
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(
                target: "runner::perf",
                "{} took {}ms",
                self.program,
                elapsed.as_millis()
            );
        }

        Ok(ToolOutput {
            stdout,
            stderr,
        })
    }

    /// Execute the command and return only stdout as a trimmed string
    pub async fn output_stdout(self) -> Result<String> {
        let output = self.output().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute the command and check for success, discarding output
    pub async fn run(self) -> Result<()> {
        self.output().await?;
        Ok(())
    }
}

/// Captured output from a completed command
#[derive(Debug)]
pub struct ToolOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error output
    pub stderr: String,
}
