//! Update configuration.
//!
//! Configuration lives in an optional `refit.toml` next to the installation
//! (or anywhere via `--config`). Every field has a default matching the
//! common deployment: a git-tracked service on `origin/main`, npm-managed
//! dependencies, and a pm2 supervisor. A missing file simply means "all
//! defaults".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// File name looked up in the installation root when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "refit.toml";

fn default_config_file() -> String {
    "settings.js".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_ignore() -> Vec<String> {
    [".git", "node_modules", "tmp", "temp", "data", "session"]
        .map(String::from)
        .to_vec()
}

fn default_protected_fields() -> Vec<String> {
    ["ownerNumber", "botOwner"].map(String::from).to_vec()
}

fn default_install_command() -> Vec<String> {
    ["npm", "install", "--no-audit", "--no-fund"].map(String::from).to_vec()
}

fn default_supervisor_command() -> Vec<String> {
    ["pm2", "restart", "all"].map(String::from).to_vec()
}

const fn default_restart() -> bool {
    true
}

/// Settings for one installation's update behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Snapshot URL used when the installation carries no usable
    /// version-control metadata. May be overridden per invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,

    /// Live configuration file, relative to the installation root, holding
    /// the protected identity fields.
    #[serde(default = "default_config_file")]
    pub config_file: String,

    /// Remote whose branch tip the working tree mirrors.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Tracked branch on the remote.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Entry names skipped by the tree merge at any depth.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Configuration fields preserved across updates.
    #[serde(default = "default_protected_fields")]
    pub protected_fields: Vec<String>,

    /// Package-manager invocation run after the tree changes.
    #[serde(default = "default_install_command")]
    pub install_command: Vec<String>,

    /// Supervisor invocation that restarts the service.
    #[serde(default = "default_supervisor_command")]
    pub supervisor_command: Vec<String>,

    /// Whether to hand off to a restart at all after a successful update.
    #[serde(default = "default_restart")]
    pub restart: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            archive_url: None,
            config_file: default_config_file(),
            remote: default_remote(),
            branch: default_branch(),
            ignore: default_ignore(),
            protected_fields: default_protected_fields(),
            install_command: default_install_command(),
            supervisor_command: default_supervisor_command(),
            restart: default_restart(),
        }
    }
}

impl UpdateConfig {
    /// Loads the configuration for an installation root.
    ///
    /// An explicit `path` wins; otherwise `refit.toml` in the root is used.
    /// A missing file yields the defaults.
    pub async fn load_with_optional(path: Option<PathBuf>, root: &Path) -> Result<Self> {
        let path = path.unwrap_or_else(|| root.join(CONFIG_FILE_NAME));
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Loads the configuration from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))
    }

    /// Resolves the effective archive URL for this invocation.
    ///
    /// The per-invocation override wins over the configured default. Blank
    /// values (empty or whitespace-only) count as absent.
    #[must_use]
    pub fn resolve_archive_url(&self, override_url: Option<&str>) -> Option<String> {
        override_url
            .into_iter()
            .chain(self.archive_url.as_deref())
            .map(str::trim)
            .find(|candidate| !candidate.is_empty())
            .map(str::to_string)
    }
}
