//! Disposable service installations and upstream repositories for tests.

use super::git_helper::TestGit;
use crate::git::GitWorkspace;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway installation root.
///
/// Holds the temporary directory for the lifetime of the test; dropping the
/// service removes the whole tree.
pub struct TestService {
    temp: TempDir,
}

impl TestService {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: TempDir::new().context("Failed to create service directory")?,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Write a file under the root, creating parent directories.
    pub fn write_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Create an upstream repository the service can sync from.
    pub fn init_upstream(&self) -> Result<TestUpstream> {
        TestUpstream::new()
    }

    /// Clone the upstream into this root and return a workspace over it.
    pub fn clone_from(&self, upstream: &TestUpstream) -> Result<GitWorkspace> {
        TestGit::new(self.root()).clone_from(upstream.path())?;
        Ok(GitWorkspace::new(self.root(), "origin", "main"))
    }
}

/// An upstream repository that tests commit to.
pub struct TestUpstream {
    temp: TempDir,
    git: TestGit,
}

impl TestUpstream {
    fn new() -> Result<Self> {
        let temp = TempDir::new().context("Failed to create upstream directory")?;
        let git = TestGit::new(temp.path());
        git.init()?;
        git.set_head("main")?;
        git.config_user()?;
        Ok(Self { temp, git })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Commit one file, creating parents as needed. Returns the new HEAD.
    pub fn commit_file(&self, relative: &str, content: &str, message: &str) -> Result<String> {
        let path = self.temp.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        self.git.add_all()?;
        self.git.commit(message)?;
        self.git.rev_parse_head()
    }
}
