//! One-shot update execution.

use super::lock::SessionLock;
use crate::config::UpdateConfig;
use crate::report::ConsoleSink;
use crate::restart::{self, RestartOutcome};
use crate::session::{SessionSummary, Strategy, UpdateSession};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Run one update pass against the installation root
#[derive(Args)]
pub struct RunCommand {
    /// Archive URL override for the snapshot strategy
    ///
    /// Wins over both the `REFIT_ARCHIVE_URL` environment variable and the
    /// `archive_url` configuration value. Ignored when the version-control
    /// strategy is selected.
    #[arg(long, env = "REFIT_ARCHIVE_URL")]
    archive_url: Option<String>,

    /// Skip the restart step after a successful update
    ///
    /// The new tree is left in place; the service keeps running the old
    /// code until something else restarts it.
    #[arg(long)]
    no_restart: bool,

    /// Treat this invocation as not authorized
    ///
    /// Wrapping automation that gates updates on its own permission model
    /// passes a denied verdict through with this flag; the run is then
    /// rejected before anything is touched.
    #[arg(long)]
    unauthorized: bool,
}

impl RunCommand {
    pub async fn execute(self, root: &Path, config_path: Option<PathBuf>) -> Result<()> {
        let mut config = UpdateConfig::load_with_optional(config_path, root).await?;
        if self.no_restart {
            config.restart = false;
        }

        let _lock = SessionLock::acquire(root).await?;

        let sink = ConsoleSink::new();
        let outcome = UpdateSession::new(root, &config, &sink)
            .with_archive_override(self.archive_url)
            .with_authorization(!self.unauthorized)
            .run()
            .await;
        sink.finish_and_clear();

        let summary = outcome?;
        print_summary(&summary);

        if summary.restart == RestartOutcome::ExitScheduled {
            // The host environment brings the process back up.
            restart::exit_after_flush().await
        }
        Ok(())
    }
}

fn print_summary(summary: &SessionSummary) {
    println!("\n{}", "Update complete!".green().bold());
    match summary.strategy {
        Strategy::Vcs => {
            if let Some(delta) = &summary.delta {
                if delta.up_to_date {
                    println!("  already up to date at {}", delta.new_revision);
                } else {
                    println!("  {} -> {}", delta.old_revision, delta.new_revision);
                    let count = delta.commits.len();
                    if count == 1 {
                        println!("  1 new commit");
                    } else {
                        println!("  {count} new commits");
                    }
                }
            }
        }
        Strategy::Archive => {
            println!("  {} files merged", summary.copied_files.len());
        }
    }
    if summary.preserved_fields > 0 {
        println!("  {} protected fields preserved", summary.preserved_fields);
    }
    match summary.restart {
        RestartOutcome::Supervised => println!("  service restarted via supervisor"),
        RestartOutcome::ExitScheduled => println!("  restarting via process exit"),
        RestartOutcome::Skipped => println!("  restart skipped"),
    }
}
