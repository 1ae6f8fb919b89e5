//! Platform-specific helpers.
//!
//! The update pipeline shells out to several external tools (git, archive
//! extractors, package managers, process supervisors) and needs consistent
//! behavior for locating them and for resolving user-supplied paths across
//! Windows, macOS, and Linux.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Returns `true` when running on Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(target_os = "windows")
}

/// Returns the current user's home directory.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().context(
        "unable to determine home directory. \
         Set the HOME (Unix) or USERPROFILE (Windows) environment variable",
    )
}

/// Returns the platform-appropriate git executable name.
#[must_use]
pub const fn get_git_command() -> &'static str {
    if cfg!(target_os = "windows") {
        "git.exe"
    } else {
        "git"
    }
}

/// Checks whether an executable is reachable through `PATH`.
#[must_use]
pub fn command_exists(command: &str) -> bool {
    which::which(command).is_ok()
}

/// Resolves a user-supplied path, expanding `~` and environment variables.
///
/// A leading `~/` expands to the home directory. A bare `~` or `~user` form is
/// rejected. Environment variables use `$VAR` / `${VAR}` syntax on all
/// platforms.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = if let Some(rest) = path.strip_prefix("~/") {
        get_home_dir()?.join(rest)
    } else if path == "~" || path.starts_with('~') {
        return Err(anyhow::anyhow!(
            "unsupported home directory syntax: {path}. Use ~/ for the current user's home"
        ));
    } else {
        let expanded = shellexpand::env(path)
            .with_context(|| format!("failed to expand environment variables in: {path}"))?;
        PathBuf::from(expanded.as_ref())
    };
    Ok(expanded)
}

/// Renders a relative path with forward slashes regardless of platform.
#[must_use]
pub fn unix_path_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
