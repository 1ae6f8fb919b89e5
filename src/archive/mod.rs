//! Archive-snapshot update strategy.
//!
//! When the installation carries no usable version-control metadata, the
//! update is driven from a zip snapshot instead: download it into a scratch
//! directory under the installation root, extract it, and locate the
//! effective project root inside the extracted tree. The resulting
//! [`ArchiveLayout`] feeds the tree merger.
//!
//! Scratch artifacts (the downloaded archive and the extraction directory)
//! live under `<root>/tmp` and are removed when the [`Scratch`] guard drops,
//! on success and failure alike.

pub mod download;
pub mod extract;

pub use download::download;
pub use extract::extract;

use crate::utils::fs::{ensure_dir, remove_dir_all};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Directory under the installation root reserved for transient artifacts.
pub const SCRATCH_DIR_NAME: &str = "tmp";

const ARCHIVE_FILE_NAME: &str = "update.zip";
const EXTRACT_DIR_NAME: &str = "update_extract";

/// Artifacts produced by fetching one archive snapshot.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    /// URL the snapshot was fetched from, after configuration resolution.
    pub url: String,
    /// Local path of the downloaded archive.
    pub archive_path: PathBuf,
    /// Directory the archive was extracted into.
    pub extract_dir: PathBuf,
    /// Effective project root inside `extract_dir`, wrapper folder resolved.
    pub root: PathBuf,
    /// Hex SHA-256 digest of the downloaded archive.
    pub sha256: String,
}

/// Scratch space for one update session.
///
/// Dropping the guard removes the archive file and the extraction directory
/// but leaves the scratch directory itself in place; operators may keep other
/// files there.
#[derive(Debug)]
pub struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    /// Creates (or reuses) the scratch directory under `install_root`.
    pub fn create(install_root: &Path) -> Result<Self> {
        let dir = install_root.join(SCRATCH_DIR_NAME);
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.dir.join(ARCHIVE_FILE_NAME)
    }

    #[must_use]
    pub fn extract_dir(&self) -> PathBuf {
        self.dir.join(EXTRACT_DIR_NAME)
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let archive = self.archive_path();
        if archive.exists() {
            if let Err(error) = std::fs::remove_file(&archive) {
                tracing::debug!(target: "archive", "failed to remove {}: {error}", archive.display());
            }
        }
        let extract_dir = self.extract_dir();
        if extract_dir.exists() {
            if let Err(error) = std::fs::remove_dir_all(&extract_dir) {
                tracing::debug!(target: "archive", "failed to remove {}: {error}", extract_dir.display());
            }
        }
    }
}

/// Resolves the effective root of an extracted archive.
///
/// Hosting-service exports wrap the whole project in a single top-level
/// folder named after the project and branch. When the extraction output has
/// exactly one entry and it is a directory, that directory is the root;
/// otherwise the output directory itself is.
pub fn locate_root(out_dir: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(out_dir)
        .with_context(|| format!("failed to read {}", out_dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to list {}", out_dir.display()))?;

    if entries.len() == 1 {
        let candidate = entries[0].path();
        if candidate.is_dir() {
            tracing::debug!(target: "archive", "unwrapping {}", candidate.display());
            return Ok(candidate);
        }
    }
    Ok(out_dir.to_path_buf())
}

/// Downloads and extracts the snapshot at `url` into the scratch space.
pub async fn fetch_archive(url: &str, scratch: &Scratch) -> Result<ArchiveLayout> {
    let archive_path = scratch.archive_path();
    let sha256 = download(url, &archive_path).await?;
    tracing::info!(target: "archive", "downloaded {url} (sha256 {sha256})");

    let extract_dir = scratch.extract_dir();
    // A crashed earlier session may have left a stale extraction behind.
    remove_dir_all(&extract_dir)?;

    extract(&archive_path, &extract_dir).await?;
    let root = locate_root(&extract_dir)?;

    Ok(ArchiveLayout {
        url: url.to_string(),
        archive_path,
        extract_dir,
        root,
        sha256,
    })
}
