//! Read-only update probe.

use crate::config::UpdateConfig;
use crate::git::{GitWorkspace, UNKNOWN_REVISION};
use crate::session::{Strategy, select_strategy};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Report what an update run would do
#[derive(Args)]
pub struct CheckCommand {
    /// Output format: text or json
    ///
    /// Controls how the probe result is rendered:
    /// - `text`: Human-readable output
    /// - `json`: Structured output suitable for automation
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// Structured JSON output for automation
    Json,
}

#[derive(Serialize)]
struct CheckReport {
    root: String,
    strategy: String,
    revision: String,
    archive_url_configured: bool,
}

impl CheckCommand {
    pub async fn execute(self, root: &Path, config_path: Option<PathBuf>) -> Result<()> {
        let config = UpdateConfig::load_with_optional(config_path, root).await?;
        let strategy = select_strategy(root);

        let revision = match strategy {
            Strategy::Vcs => {
                GitWorkspace::new(root, config.remote.as_str(), config.branch.as_str())
                    .current_revision()
                    .await
            }
            Strategy::Archive => UNKNOWN_REVISION.to_string(),
        };
        let archive_url_configured = config.resolve_archive_url(None).is_some();

        let report = CheckReport {
            root: root.display().to_string(),
            strategy: strategy.to_string(),
            revision,
            archive_url_configured,
        };

        match self.format {
            OutputFormat::Text => print_text(&report),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }
        Ok(())
    }
}

fn print_text(report: &CheckReport) {
    println!("{}", "Update probe".bold());
    println!("  root: {}", report.root);
    println!("  strategy: {}", report.strategy);
    println!("  revision: {}", report.revision);
    if report.archive_url_configured {
        println!("  archive url: configured");
    } else {
        println!("  archive url: {}", "not configured".yellow());
    }
}
