//! Git command wrapper for tests.
//!
//! Thin, synchronous wrapper around the git binary for building throwaway
//! repositories. Test-only; production code goes through
//! [`crate::git::GitWorkspace`].

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct TestGit {
    repo_path: PathBuf,
}

impl TestGit {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    fn run_git_command(&self, args: &[&str], action: &str) -> Result<std::process::Output> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .with_context(|| action.to_string())?;

        if !output.status.success() {
            bail!("{} failed: {}", action, String::from_utf8_lossy(&output.stderr));
        }

        Ok(output)
    }

    /// Initialize a repository in the path.
    pub fn init(&self) -> Result<()> {
        self.run_git_command(&["init"], "Failed to initialize repository")?;
        Ok(())
    }

    /// Point HEAD at a branch, fixing the name before the first commit.
    pub fn set_head(&self, branch: &str) -> Result<()> {
        self.run_git_command(
            &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")],
            &format!("Failed to set HEAD to branch: {branch}"),
        )?;
        Ok(())
    }

    /// Configure a committer identity.
    pub fn config_user(&self) -> Result<()> {
        self.run_git_command(
            &["config", "user.email", "test@refit.example"],
            "Failed to configure git user email",
        )?;
        self.run_git_command(
            &["config", "user.name", "Test User"],
            "Failed to configure git user name",
        )?;
        Ok(())
    }

    /// Stage everything.
    pub fn add_all(&self) -> Result<()> {
        self.run_git_command(&["add", "."], "Failed to stage files")?;
        Ok(())
    }

    /// Commit staged changes.
    pub fn commit(&self, message: &str) -> Result<()> {
        self.run_git_command(&["commit", "-m", message], "Failed to create commit")?;
        Ok(())
    }

    /// Current HEAD commit SHA.
    pub fn rev_parse_head(&self) -> Result<String> {
        let output = self.run_git_command(&["rev-parse", "HEAD"], "Failed to read HEAD")?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Clone a source repository into this (empty) path.
    pub fn clone_from(&self, source: &Path) -> Result<()> {
        let source = source.to_string_lossy();
        self.run_git_command(&["clone", &source, "."], "Failed to clone upstream repository")?;
        Ok(())
    }
}
