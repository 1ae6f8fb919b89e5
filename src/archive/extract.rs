//! Archive extraction through an ordered provider chain.
//!
//! Hosting panels differ wildly in what they ship: some have `unzip`, some
//! only `7z`, some nothing at all. Extraction therefore walks a fixed priority
//! chain of providers, probing each before running it and stopping at the
//! first success. The last unix provider is an in-process extractor, so on a
//! bare panel extraction still works as long as the archive itself is sound.
//! Windows uses the native `Expand-Archive` cmdlet instead.

use crate::core::UpdateError;
use crate::runner::ToolCommand;
use crate::utils::platform::{command_exists, is_windows};
use anyhow::{Context, Result, anyhow};
use std::path::Path;

/// One extraction capability, probed before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extractor {
    Unzip,
    SevenZip,
    Builtin,
    PowerShell,
}

impl Extractor {
    const fn name(self) -> &'static str {
        match self {
            Self::Unzip => "unzip",
            Self::SevenZip => "7z",
            Self::Builtin => "builtin",
            Self::PowerShell => "powershell",
        }
    }

    /// Fixed priority order for the current platform.
    fn chain() -> &'static [Self] {
        if is_windows() {
            &[Self::PowerShell]
        } else {
            &[Self::Unzip, Self::SevenZip, Self::Builtin]
        }
    }

    fn available(self) -> bool {
        match self {
            Self::Builtin => true,
            other => command_exists(other.name()),
        }
    }

    async fn run(self, archive: &Path, out_dir: &Path) -> Result<()> {
        match self {
            Self::Unzip => {
                ToolCommand::new("unzip")
                    .arg("-o")
                    .arg(archive.display().to_string())
                    .arg("-d")
                    .arg(out_dir.display().to_string())
                    .run()
                    .await
            }
            Self::SevenZip => {
                // 7z takes the output directory glued to the flag.
                ToolCommand::new("7z")
                    .args(["x", "-y"])
                    .arg(archive.display().to_string())
                    .arg(format!("-o{}", out_dir.display()))
                    .run()
                    .await
            }
            Self::Builtin => extract_builtin(archive, out_dir).await,
            Self::PowerShell => {
                ToolCommand::new("powershell")
                    .args(["-NoProfile", "-Command"])
                    .arg(expand_archive_script(archive, out_dir))
                    .run()
                    .await
            }
        }
    }
}

/// Builds the `Expand-Archive` invocation, doubling embedded single quotes.
fn expand_archive_script(archive: &Path, out_dir: &Path) -> String {
    let quote = |path: &Path| path.display().to_string().replace('\'', "''");
    format!(
        "Expand-Archive -Path '{}' -DestinationPath '{}' -Force",
        quote(archive),
        quote(out_dir)
    )
}

/// In-process zip extraction, used when no external tool is usable.
async fn extract_builtin(archive: &Path, out_dir: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let out_dir = out_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_builtin_sync(&archive, &out_dir))
        .await
        .map_err(|error| anyhow!("task join error during archive extraction: {error}"))?
}

fn extract_builtin_sync(archive: &Path, out_dir: &Path) -> Result<()> {
    let file = std::fs::File::open(archive)
        .with_context(|| format!("failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("unreadable zip archive {}", archive.display()))?;
    zip.extract(out_dir)
        .with_context(|| format!("failed to extract into {}", out_dir.display()))?;
    Ok(())
}

/// Extracts `archive` into `out_dir`, returning the name of the provider that
/// succeeded.
///
/// Providers that fail their probe or their run are skipped and recorded; if
/// the whole chain is exhausted the error names every provider attempted.
pub async fn extract(archive: &Path, out_dir: &Path) -> Result<String> {
    crate::utils::fs::ensure_dir(out_dir)?;

    let mut attempted = Vec::new();
    for extractor in Extractor::chain() {
        if !extractor.available() {
            tracing::debug!(target: "archive", "{} not found, skipping", extractor.name());
            attempted.push(extractor.name().to_string());
            continue;
        }
        match extractor.run(archive, out_dir).await {
            Ok(()) => {
                tracing::info!(target: "archive", "extracted {} with {}", archive.display(), extractor.name());
                return Ok(extractor.name().to_string());
            }
            Err(error) => {
                tracing::warn!(
                    target: "archive",
                    "{} failed on {}: {error:#}",
                    extractor.name(),
                    archive.display()
                );
                attempted.push(extractor.name().to_string());
            }
        }
    }

    Err(UpdateError::Extraction {
        archive: archive.display().to_string(),
        attempted,
    }
    .into())
}
