//! File system helpers shared across the update pipeline.
//!
//! Everything here is deliberately small: directory creation that tolerates
//! existing paths, removal that tolerates missing ones, and a bounded string
//! truncation used when reporting failures to external sinks.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Creates a directory and all missing parents.
///
/// Succeeds if the directory already exists. Fails if the path exists but is
/// not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            let platform_help = if crate::utils::platform::is_windows() {
                "On Windows: check that long path support is enabled"
            } else {
                "Check directory permissions and path validity"
            };
            format!(
                "failed to create directory: {}\n\n{}",
                path.display(),
                platform_help
            )
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!(
            "path exists but is not a directory: {}",
            path.display()
        ));
    }
    Ok(())
}

/// Ensures the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Removes a directory tree, succeeding when the path does not exist.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Truncates a string to at most `max_chars` characters.
///
/// Operates on character boundaries, so multi-byte text is never split in the
/// middle of a code point.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}
