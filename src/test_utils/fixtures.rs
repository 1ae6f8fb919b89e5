//! Test fixtures for creating sample update payloads
//!
//! This module provides builders for creating test data like zip archives
//! and service configuration files.

use anyhow::{Context, Result};
use std::fs;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Test fixture for building small zip archives
///
/// Entries are stored uncompressed; nested entry names create their parent
/// directories on extraction.
#[derive(Clone, Debug, Default)]
pub struct ZipFixture {
    entries: Vec<(String, String)>,
}

impl ZipFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file entry
    #[must_use]
    pub fn file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.entries.push((name.into(), content.into()));
        self
    }

    /// Write the archive to a file on disk
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create archive at {}", path.display()))?;
        self.write_into(file)
    }

    /// Write the archive into an in-memory buffer
    pub fn write_to_vec(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.write_into(std::io::Cursor::new(buf))
    }

    fn write_into<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in &self.entries {
            zip.start_file(name.as_str(), options)
                .with_context(|| format!("Failed to start zip entry: {name}"))?;
            zip.write_all(content.as_bytes())
                .with_context(|| format!("Failed to write zip entry: {name}"))?;
        }
        zip.finish().context("Failed to finalize zip archive")?;
        Ok(())
    }
}

/// Test fixture for creating sample settings.js files
#[derive(Clone, Debug)]
pub struct SettingsFixture {
    pub content: String,
    pub name: String,
}

impl SettingsFixture {
    /// Settings customized by an operator, as found on a live installation
    pub fn basic() -> Self {
        Self {
            name: "basic".to_string(),
            content: r"
const settings = {
    botName: 'Refit Test Bot',
    ownerNumber: '15551234567',
    botOwner: 'Operator Prime',
    prefix: '.',
    autoRead: true,
};

module.exports = settings;
"
            .trim()
            .to_string(),
        }
    }

    /// Shipped defaults, as found inside a fresh update payload
    pub fn upstream_defaults() -> Self {
        Self {
            name: "upstream_defaults".to_string(),
            content: r"
const settings = {
    botName: 'Refit Test Bot',
    ownerNumber: 'YOUR_NUMBER',
    botOwner: 'Bot Operator',
    prefix: '!',
    autoRead: false,
};

module.exports = settings;
"
            .trim()
            .to_string(),
        }
    }

    /// Write the settings file into a directory
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join("settings.js");
        fs::write(&path, &self.content)?;
        Ok(path)
    }
}
