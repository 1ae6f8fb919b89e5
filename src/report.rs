//! Session progress reporting.
//!
//! An update session owns exactly one reporting capability: [`StatusSink`].
//! Whatever triggered the update decides what a "report" means; the console
//! sink below renders a spinner line, while other frontends may create or
//! edit a message in their own channel. The session awaits each report before
//! continuing so that sink-side edits stay causally ordered.

use anyhow::Result;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Capability through which an update session reports progress.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Delivers one human-readable progress line.
    async fn report(&self, text: &str) -> Result<()>;
}

/// Renders session progress as a terminal spinner.
///
/// Honors `REFIT_NO_PROGRESS`: when set, the spinner is hidden and progress
/// is only visible through the log output.
pub struct ConsoleSink {
    spinner: ProgressBar,
}

impl ConsoleSink {
    #[must_use]
    pub fn new() -> Self {
        let spinner = if std::env::var("REFIT_NO_PROGRESS").is_ok() {
            ProgressBar::hidden()
        } else {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(spinner_style());
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        };
        Self { spinner }
    }

    /// Stops the spinner and erases its line.
    pub fn finish_and_clear(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusSink for ConsoleSink {
    async fn report(&self, text: &str) -> Result<()> {
        self.spinner.set_message(text.to_string());
        tracing::debug!(target: "report", "{text}");
        Ok(())
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
