//! Git-backed update strategy.
//!
//! The live installation is treated as a mirror of the remote branch, not as a
//! workspace: syncing force-resets the tree to the remote tip and removes
//! untracked leftovers. Local modifications do not survive an update.
//!
//! A sync produces a [`RevisionDelta`] describing what changed. Reading the
//! current revision is best-effort (a corrupt or detached checkout yields the
//! [`UNKNOWN_REVISION`] sentinel), while fetch and reset failures abort the
//! whole session.

use crate::runner::ToolCommand;
use crate::utils::platform::get_git_command;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Sentinel used when the current revision cannot be read.
pub const UNKNOWN_REVISION: &str = "unknown";

/// One entry from the changed-file listing between two revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Single-letter git status (`A`, `M`, `D`, or a rename score like `R100`).
    pub status: String,
    /// Path relative to the repository root.
    pub path: String,
}

/// Outcome of syncing the working tree to the remote tip.
///
/// `commits` and `changed_files` are best-effort context for reporting. They
/// stay empty when the tree was already up to date, when the old revision was
/// unreadable, or when git could not produce them.
#[derive(Debug, Clone)]
pub struct RevisionDelta {
    pub old_revision: String,
    pub new_revision: String,
    pub up_to_date: bool,
    pub commits: Vec<String>,
    pub changed_files: Vec<FileChange>,
}

/// Handle to the live installation's git checkout.
#[derive(Debug, Clone)]
pub struct GitWorkspace {
    root: PathBuf,
    remote: String,
    branch: String,
}

impl GitWorkspace {
    pub fn new(root: impl AsRef<Path>, remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Checks whether the installation root carries version-control metadata.
    #[must_use]
    pub fn is_repository(&self) -> bool {
        self.root.join(".git").exists()
    }

    fn git(&self) -> ToolCommand {
        ToolCommand::new(get_git_command()).current_dir(&self.root)
    }

    /// Reads the current `HEAD` revision.
    ///
    /// Returns [`UNKNOWN_REVISION`] when the revision cannot be resolved, for
    /// example in a fresh checkout without commits. This must not abort an
    /// update: the sync still proceeds against the remote tip.
    pub async fn current_revision(&self) -> String {
        match self
            .git()
            .args(["rev-parse", "HEAD"])
            .output_stdout()
            .await
        {
            Ok(revision) => revision,
            Err(error) => {
                tracing::warn!(
                    target: "git",
                    "unable to read current revision, continuing with sentinel: {error:#}"
                );
                UNKNOWN_REVISION.to_string()
            }
        }
    }

    /// Syncs the working tree to the remote branch tip.
    ///
    /// Sequence: capture the current revision, fetch all remotes, resolve the
    /// tracked branch's tip, gather commit and file context when the tree is
    /// behind, then hard-reset to the tip and remove untracked files. Fetch and
    /// reset failures are fatal; nothing is reset before a successful fetch.
    pub async fn sync(&self) -> Result<RevisionDelta> {
        let old_revision = self.current_revision().await;

        self.git()
            .args(["fetch", "--all", "--prune"])
            .env("GIT_TERMINAL_PROMPT", "0")
            .run()
            .await
            .context("git fetch failed")?;

        let remote_ref = format!("{}/{}", self.remote, self.branch);
        let new_revision = self
            .git()
            .args(["rev-parse", &remote_ref])
            .output_stdout()
            .await
            .with_context(|| format!("unable to resolve remote tip {remote_ref}"))?;

        let up_to_date = old_revision == new_revision;

        let (commits, changed_files) = if up_to_date {
            (Vec::new(), Vec::new())
        } else {
            (
                self.commit_log(&old_revision, &new_revision).await,
                self.changed_files(&old_revision, &new_revision).await,
            )
        };

        self.git()
            .args(["reset", "--hard", &new_revision])
            .run()
            .await
            .with_context(|| format!("git reset --hard {new_revision} failed"))?;

        self.git()
            .args(["clean", "-fd"])
            .run()
            .await
            .context("git clean failed")?;

        Ok(RevisionDelta {
            old_revision,
            new_revision,
            up_to_date,
            commits,
            changed_files,
        })
    }

    /// Lists commits between two revisions, one formatted line per commit.
    ///
    /// Best-effort: an unresolvable range (for instance when the old revision
    /// is the unknown sentinel) yields an empty list.
    async fn commit_log(&self, old: &str, new: &str) -> Vec<String> {
        let range = format!("{old}..{new}");
        match self
            .git()
            .args(["log", "--pretty=format:%h %s (%an)", &range])
            .output_stdout()
            .await
        {
            Ok(log) => log.lines().map(str::to_string).collect(),
            Err(error) => {
                tracing::debug!(target: "git", "commit log unavailable for {range}: {error:#}");
                Vec::new()
            }
        }
    }

    /// Lists files changed between two revisions. Best-effort like
    /// [`Self::commit_log`].
    async fn changed_files(&self, old: &str, new: &str) -> Vec<FileChange> {
        match self
            .git()
            .args(["diff", "--name-status", old, new])
            .output_stdout()
            .await
        {
            Ok(diff) => diff.lines().filter_map(parse_name_status).collect(),
            Err(error) => {
                tracing::debug!(
                    target: "git",
                    "changed-file listing unavailable for {old}..{new}: {error:#}"
                );
                Vec::new()
            }
        }
    }
}

/// Parses one `--name-status` line into a [`FileChange`].
///
/// Renames report two tab-separated paths; the destination wins because that
/// is the path present after the sync.
fn parse_name_status(line: &str) -> Option<FileChange> {
    let mut fields = line.split('\t');
    let status = fields.next()?.trim();
    let path = fields.next_back()?.trim();
    if status.is_empty() || path.is_empty() {
        return None;
    }
    Some(FileChange {
        status: status.to_string(),
        path: path.to_string(),
    })
}

/// Checks that a git client is invocable on this system.
#[must_use]
pub fn is_git_installed() -> bool {
    std::process::Command::new(get_git_command())
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
