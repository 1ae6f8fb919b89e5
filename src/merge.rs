//! Additive tree merge into the live installation.
//!
//! The incoming tree is copied over the installation root file by file.
//! Entries whose name matches the ignore set are skipped at any depth, and an
//! ignored directory prunes its whole subtree. Files present in the
//! destination but absent from the source are never deleted: runtime state
//! (sessions, local data, scratch space) lives alongside the code and must
//! survive the update.
//!
//! The copy is not transactional. A mid-merge I/O failure leaves a partially
//! updated tree, which the session surfaces as a fatal error without rollback.

use crate::utils::fs::ensure_parent_dir;
use crate::utils::platform::unix_path_string;
use anyhow::{Context, Result, anyhow};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursive, additive copy of a source tree into a destination root.
///
/// Produces the list of copied files as source-relative, forward-slash paths
/// in deterministic (per-directory sorted) order.
#[derive(Debug, Clone)]
pub struct MergePlan {
    source: PathBuf,
    dest: PathBuf,
    ignore: HashSet<String>,
}

impl MergePlan {
    pub fn new<I, S>(source: impl AsRef<Path>, dest: impl AsRef<Path>, ignore: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: source.as_ref().to_path_buf(),
            dest: dest.as_ref().to_path_buf(),
            ignore: ignore.into_iter().map(Into::into).collect(),
        }
    }

    fn is_ignored(&self, name: &OsStr) -> bool {
        name.to_str().is_some_and(|name| self.ignore.contains(name))
    }

    /// Runs the merge on a blocking thread.
    pub async fn execute(&self) -> Result<Vec<String>> {
        let plan = self.clone();
        tokio::task::spawn_blocking(move || plan.execute_sync())
            .await
            .map_err(|error| anyhow!("task join error during tree merge: {error}"))?
    }

    fn execute_sync(&self) -> Result<Vec<String>> {
        let mut copied = Vec::new();

        let walker = WalkDir::new(&self.source)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            // The source root keeps its name out of the ignore check; only
            // entries inside the tree are subject to it.
            .filter_entry(|entry| entry.depth() == 0 || !self.is_ignored(entry.file_name()));

        for entry in walker {
            let entry = entry.with_context(|| {
                format!("failed to read directory entry under {}", self.source.display())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.source).with_context(|| {
                format!("entry {} escapes source root", entry.path().display())
            })?;
            let target = self.dest.join(relative);

            ensure_parent_dir(&target)?;
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy {}", relative.display()))?;
            copied.push(unix_path_string(relative));
        }

        tracing::info!(
            target: "merge",
            "copied {} files from {} into {}",
            copied.len(),
            self.source.display(),
            self.dest.display()
        );
        Ok(copied)
    }
}
