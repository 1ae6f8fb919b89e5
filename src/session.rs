//! Update session orchestration.
//!
//! One [`UpdateSession`] is a single pass through a fixed sequence: select a
//! strategy, bring the new tree in (version-control sync, or archive fetch
//! plus merge), restore protected configuration, reinstall dependencies, and
//! hand off to a restart. Every step gates the next; the first failure ends
//! the session, is reported through the status sink as one bounded message,
//! and always skips the restart.
//!
//! Sessions are not internally serialized. Callers must ensure at most one
//! session runs against an installation root at a time (the CLI does this
//! with a file lock); two concurrent sessions would race on the same files.

use crate::archive::{self, SCRATCH_DIR_NAME, Scratch};
use crate::config::UpdateConfig;
use crate::core::UpdateError;
use crate::deps::DependencyInstaller;
use crate::git::{GitWorkspace, RevisionDelta, is_git_installed};
use crate::merge::MergePlan;
use crate::preserve::ConfigPreserver;
use crate::report::StatusSink;
use crate::restart::{RestartOutcome, Restarter};
use crate::utils::fs::truncate_chars;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Maximum characters of failure detail forwarded to the status sink.
///
/// Reporting channels have bounded message sizes; the session truncates on a
/// character boundary so multi-byte text survives the cut.
pub const MAX_REPORT_LEN: usize = 1000;

/// How the new tree is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Sync the working tree to the remote branch tip.
    Vcs,
    /// Download a snapshot archive and merge it over the installation.
    Archive,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vcs => write!(f, "version-control"),
            Self::Archive => write!(f, "archive"),
        }
    }
}

/// Phases of one update pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    SelectingStrategy,
    Syncing,
    Merging,
    PreservingConfig,
    InstallingDeps,
    Restarting,
    Completed,
    Failed,
}

/// Chooses between the version-control and archive strategies.
///
/// Version control wins when the root carries metadata and a client binary is
/// invocable; everything else falls back to the archive snapshot. Pure probe,
/// no mutation.
#[must_use]
pub fn select_strategy(root: &Path) -> Strategy {
    let has_metadata = root.join(".git").exists();
    let has_client = is_git_installed();
    tracing::debug!(
        target: "session",
        "strategy probe: metadata={has_metadata} client={has_client}"
    );
    if has_metadata && has_client {
        Strategy::Vcs
    } else {
        Strategy::Archive
    }
}

/// What a completed session did.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub strategy: Strategy,
    /// Revision movement, for the version-control strategy.
    pub delta: Option<RevisionDelta>,
    /// Files copied into the installation, for the archive strategy.
    pub copied_files: Vec<String>,
    /// Protected fields captured and re-injected.
    pub preserved_fields: usize,
    pub restart: RestartOutcome,
}

/// One single-pass update run against an installation root.
pub struct UpdateSession<'a, S> {
    root: PathBuf,
    config: &'a UpdateConfig,
    sink: &'a S,
    archive_override: Option<String>,
    authorized: bool,
    phase: Phase,
}

impl<'a, S: StatusSink> UpdateSession<'a, S> {
    pub fn new(root: impl AsRef<Path>, config: &'a UpdateConfig, sink: &'a S) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
            sink,
            archive_override: None,
            authorized: true,
            phase: Phase::Idle,
        }
    }

    /// Sets a per-invocation archive URL that wins over the configured one.
    #[must_use]
    pub fn with_archive_override(mut self, url: Option<String>) -> Self {
        self.archive_override = url;
        self
    }

    /// Supplies the caller's authorization verdict.
    ///
    /// The session performs no authorization logic of its own; a negative
    /// verdict ends the run before a strategy is even selected.
    #[must_use]
    pub fn with_authorization(mut self, authorized: bool) -> Self {
        self.authorized = authorized;
        self
    }

    /// Runs the session to completion or failure.
    ///
    /// On failure the sink receives one bounded report and the error
    /// propagates to the caller; the restart step never runs.
    pub async fn run(mut self) -> Result<SessionSummary> {
        match self.drive().await {
            Ok(summary) => Ok(summary),
            Err(error) => {
                self.set_phase(Phase::Failed);
                let detail = truncate_chars(&format!("{error:#}"), MAX_REPORT_LEN);
                self.report(&format!("update failed:\n{detail}")).await;
                Err(error)
            }
        }
    }

    async fn drive(&mut self) -> Result<SessionSummary> {
        if !self.authorized {
            return Err(UpdateError::NotAuthorized.into());
        }

        self.set_phase(Phase::SelectingStrategy);
        self.report("updating service, please wait").await;
        let strategy = select_strategy(&self.root);
        tracing::info!(target: "session", "selected {strategy} strategy for {}", self.root.display());

        // Capture before anything touches the tree, whichever strategy runs:
        // the sync and the merge both replace the configuration file.
        let preserver = ConfigPreserver::new(
            self.root.join(&self.config.config_file),
            self.config.protected_fields.iter().cloned(),
        );
        let captured = preserver.capture();

        self.set_phase(Phase::Syncing);
        let (delta, copied_files) = match strategy {
            Strategy::Vcs => {
                self.report("syncing with version control").await;
                let workspace =
                    GitWorkspace::new(&self.root, &*self.config.remote, &*self.config.branch);
                let delta = workspace.sync().await?;
                self.report(&describe_delta(&delta)).await;
                (Some(delta), Vec::new())
            }
            Strategy::Archive => {
                let url = self
                    .config
                    .resolve_archive_url(self.archive_override.as_deref())
                    .ok_or(UpdateError::ArchiveUrlMissing)?;

                self.report("downloading update archive").await;
                let scratch = Scratch::create(&self.root)?;
                let layout = archive::fetch_archive(&url, &scratch).await?;

                self.set_phase(Phase::Merging);
                self.report("merging update into installation").await;
                // The scratch directory is never update content, whatever the
                // configured ignore set says.
                let ignore = self
                    .config
                    .ignore
                    .iter()
                    .cloned()
                    .chain(std::iter::once(SCRATCH_DIR_NAME.to_string()));
                let copied = MergePlan::new(&layout.root, &self.root, ignore).execute().await?;
                self.report(&format!("merged {} files", copied.len())).await;
                (None, copied)
            }
        };

        self.set_phase(Phase::PreservingConfig);
        let preserved_fields = captured.len();
        if !captured.is_empty() {
            self.report("restoring protected configuration").await;
            preserver.restore(&captured);
        }

        self.set_phase(Phase::InstallingDeps);
        self.report("installing dependencies").await;
        DependencyInstaller::new(&self.root, self.config.install_command.iter().cloned())
            .install()
            .await?;

        self.set_phase(Phase::Restarting);
        if self.config.restart {
            self.report("update complete, restarting service").await;
        } else {
            self.report("update complete, restart skipped").await;
        }
        let restart = Restarter::new(
            &self.root,
            self.config.supervisor_command.iter().cloned(),
            self.config.restart,
        )
        .restart()
        .await;

        self.set_phase(Phase::Completed);
        Ok(SessionSummary {
            strategy,
            delta,
            copied_files,
            preserved_fields,
            restart,
        })
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::debug!(target: "session", "phase {:?} -> {phase:?}", self.phase);
        self.phase = phase;
    }

    /// Delivers one status line, absorbing sink failures.
    ///
    /// A broken reporting channel must not abort destructive work already in
    /// flight, so sink errors are logged and swallowed.
    async fn report(&self, text: &str) {
        if let Err(error) = self.sink.report(text).await {
            tracing::warn!(target: "session", "status report failed: {error:#}");
        }
    }
}

fn describe_delta(delta: &RevisionDelta) -> String {
    if delta.up_to_date {
        format!("already up to date at {}", short_rev(&delta.new_revision))
    } else {
        let count = delta.commits.len();
        let noun = if count == 1 { "commit" } else { "commits" };
        format!(
            "updated {} to {} ({count} new {noun})",
            short_rev(&delta.old_revision),
            short_rev(&delta.new_revision)
        )
    }
}

/// First seven characters of a revision, on a character boundary.
fn short_rev(revision: &str) -> &str {
    match revision.char_indices().nth(7) {
        Some((index, _)) => &revision[..index],
        None => revision,
    }
}
