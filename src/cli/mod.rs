//! Command-line interface for refit.
//!
//! Two subcommands cover the whole surface: `run` performs one update pass
//! against an installation root, and `check` reports what a run would do
//! without touching anything. Global flags select the root and an alternate
//! configuration file, and control verbosity and progress rendering.
//!
//! # Global Options
//!
//! All commands support these global options:
//! - `--root` - Installation root to operate on (default: current directory)
//! - `--config` - Path to an alternate configuration file
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors
//! - `--no-progress` - Disable the status spinner
//!
//! # Example
//!
//! ```bash
//! # Update the service in the current directory
//! refit run
//!
//! # Update a specific installation from a fixed snapshot
//! refit run --root /srv/bot --archive-url https://example.com/main.zip
//!
//! # See what a run would select
//! refit check --format json
//! ```

mod check;
mod lock;
mod run;

use crate::utils::resolve_path;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Runtime configuration for CLI execution.
///
/// Holds settings that reach the rest of the program through the process
/// environment, so tests and programmatic callers can control behavior
/// without re-parsing arguments.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level for the `RUST_LOG` environment variable.
    ///
    /// When `None`, an existing `RUST_LOG` value is preserved.
    pub log_level: Option<String>,

    /// Whether to disable the status spinner.
    ///
    /// When `true`, sets `REFIT_NO_PROGRESS` so status lines render as plain
    /// text. Useful for CI pipelines and terminals without ANSI support.
    pub no_progress: bool,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply this configuration to the process environment.
    ///
    /// Called once at the start of execution, before anything reads the
    /// affected variables and before worker threads touch the environment.
    pub fn apply_to_env(&self) {
        if let Some(ref level) = self.log_level {
            unsafe { std::env::set_var("RUST_LOG", level) };
        }

        if self.no_progress {
            unsafe { std::env::set_var("REFIT_NO_PROGRESS", "1") };
        }
    }
}

/// Main CLI structure for refit.
///
/// Uses the `clap` derive API for parsing, help text, and validation. Options
/// marked `global = true` are accepted by every subcommand.
#[derive(Parser)]
#[command(
    name = "refit",
    about = "In-place updater for long-running services",
    version,
    author,
    long_about = "Refit updates a deployed service in place: it syncs the installation from \
                  version control when possible, falls back to a snapshot archive otherwise, \
                  preserves operator-edited configuration, reinstalls dependencies, and hands \
                  off to the process supervisor for a restart."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Installation root to operate on.
    ///
    /// Defaults to the current directory. Tilde and environment variables
    /// are expanded (`~/srv/bot`, `$HOME/srv/bot`).
    #[arg(long, global = true)]
    root: Option<String>,

    /// Path to an alternate configuration file.
    ///
    /// Overrides the default `refit.toml` lookup in the installation root.
    /// A missing default file falls back to built-in defaults; a missing
    /// explicit file is an error.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose output for debugging.
    ///
    /// Equivalent to `RUST_LOG=debug`.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable the status spinner.
    ///
    /// Status lines still reach the log; only the animated rendering is
    /// turned off.
    #[arg(long, global = true)]
    no_progress: bool,
}

/// Available subcommands for the refit CLI.
#[derive(Subcommand)]
enum Commands {
    /// Run one update pass against the installation root.
    ///
    /// Selects a strategy, brings the new tree in, restores protected
    /// configuration, reinstalls dependencies, and restarts the service.
    ///
    /// See [`run::RunCommand`] for detailed options and behavior.
    Run(run::RunCommand),

    /// Report what an update run would do, without changing anything.
    ///
    /// Shows the strategy a run would select, the current revision, and
    /// whether an archive URL is configured.
    ///
    /// See [`check::CheckCommand`] for detailed options and behavior.
    Check(check::CheckCommand),
}

impl Cli {
    /// Execute the CLI with configuration derived from the parsed arguments.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Build a [`CliConfig`] from the parsed arguments.
    ///
    /// Verbose wins over quiet; with neither flag the ambient `RUST_LOG`
    /// (or an info default) applies.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
        }
    }

    /// Execute with an explicit configuration, for tests and embedding.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.apply_to_env();
        init_logging();

        let root = match self.root.as_deref() {
            Some(path) => resolve_path(path)?,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let config_path = self.config.as_deref().map(resolve_path).transpose()?;

        match self.command {
            Commands::Run(cmd) => cmd.execute(&root, config_path).await,
            Commands::Check(cmd) => cmd.execute(&root, config_path).await,
        }
    }
}

/// Install the global subscriber, honoring `RUST_LOG` with an info default.
///
/// Logs go to stderr so `check --format json` output stays parseable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
