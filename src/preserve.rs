//! Protected-field preservation across updates.
//!
//! The live configuration file carries a small set of identity fields (the
//! operator's owner identifiers) that must survive an update even though the
//! incoming tree ships its own copy of the file. Values are captured before
//! the tree changes and re-injected afterwards with a minimal, pattern-anchored
//! text substitution, leaving unrelated formatting and comments untouched. A
//! full parse-and-regenerate of the file is deliberately avoided.
//!
//! Every failure here is non-fatal: a missing file, an unreadable file, or a
//! field whose declaration syntax no longer matches the expected pattern is
//! logged and skipped, and the update proceeds.

use regex::{NoExpand, Regex};
use std::path::{Path, PathBuf};

/// Field values captured from the live configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedFields {
    values: Vec<(String, String)>,
}

impl ProtectedFields {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }
}

/// Captures and restores protected fields around a tree update.
#[derive(Debug, Clone)]
pub struct ConfigPreserver {
    path: PathBuf,
    fields: Vec<String>,
}

impl ConfigPreserver {
    pub fn new<I, S>(path: impl AsRef<Path>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.as_ref().to_path_buf(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads the protected fields from the live configuration file.
    ///
    /// Absence of the file, of a field, or of a usable value is not an error;
    /// whatever could be read is returned.
    pub fn capture(&self) -> ProtectedFields {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        target: "preserve",
                        "could not read {}: {error}",
                        self.path.display()
                    );
                }
                return ProtectedFields::default();
            }
        };

        let mut values = Vec::new();
        for field in &self.fields {
            let Some(pattern) = capture_pattern(field) else {
                continue;
            };
            match pattern.captures(&text) {
                Some(captures) => {
                    let value = captures
                        .get(1)
                        .or_else(|| captures.get(2))
                        .map(|m| m.as_str())
                        .unwrap_or_default()
                        .to_string();
                    if value.is_empty() {
                        tracing::debug!(target: "preserve", "{field} is empty, not preserving");
                    } else {
                        values.push((field.clone(), value));
                    }
                }
                None => {
                    tracing::debug!(target: "preserve", "{field} not present in {}", self.path.display());
                }
            }
        }

        tracing::debug!(
            target: "preserve",
            "captured {} protected field(s) from {}",
            values.len(),
            self.path.display()
        );
        ProtectedFields { values }
    }

    /// Re-injects captured values into the post-update configuration file.
    ///
    /// Each field is rewritten in place with a first-occurrence substitution.
    /// A field whose declaration no longer matches the expected pattern is
    /// left alone and logged, never treated as fatal.
    pub fn restore(&self, captured: &ProtectedFields) {
        if captured.is_empty() {
            return;
        }

        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(
                    target: "preserve",
                    "could not read {} for restore: {error}",
                    self.path.display()
                );
                return;
            }
        };

        let mut updated = text.clone();
        let mut applied = 0usize;
        for (field, value) in &captured.values {
            let Some(pattern) = replace_pattern(field) else {
                continue;
            };
            if !pattern.is_match(&updated) {
                tracing::warn!(
                    target: "preserve",
                    "{field} declaration not found in updated {}; value not restored",
                    self.path.display()
                );
                continue;
            }
            // Single-quoted output unless the value itself contains one.
            let replacement = if value.contains('\'') {
                format!("{field}: \"{value}\"")
            } else {
                format!("{field}: '{value}'")
            };
            updated = pattern.replace(&updated, NoExpand(&replacement)).into_owned();
            applied += 1;
        }

        if applied == 0 {
            return;
        }
        if let Err(error) = std::fs::write(&self.path, updated) {
            tracing::warn!(
                target: "preserve",
                "could not write {}: {error}",
                self.path.display()
            );
            return;
        }
        tracing::info!(
            target: "preserve",
            "restored {applied} protected field(s) in {}",
            self.path.display()
        );
    }
}

// Declarations may use either quote style and any whitespace around the
// colon; group 1 carries a single-quoted value, group 2 a double-quoted one.
fn capture_pattern(field: &str) -> Option<Regex> {
    compile(
        &format!(r#"{}\s*:\s*(?:'([^']*)'|"([^"]*)")"#, regex::escape(field)),
        field,
    )
}

fn replace_pattern(field: &str) -> Option<Regex> {
    compile(
        &format!(r#"{}\s*:\s*(?:'[^']*'|"[^"]*")"#, regex::escape(field)),
        field,
    )
}

fn compile(pattern: &str, field: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(error) => {
            tracing::warn!(target: "preserve", "unusable pattern for {field}: {error}");
            None
        }
    }
}
