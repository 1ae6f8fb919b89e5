//! Test utilities for refit
//!
//! This module provides utilities for writing tests, including helpers for
//! building throwaway service installations, upstream repositories, update
//! archives, and configuration files, plus status sinks that record or
//! reject reports.
//!
//! # Test Isolation
//!
//! Every helper works against its own temporary directory, so tests never
//! share state and never touch a real installation. The module is compiled
//! for unit tests and, through the `test-utils` feature, for integration
//! tests.

pub mod fixtures;
pub mod git_helper;
pub mod service;

pub use fixtures::{SettingsFixture, ZipFixture};
pub use git_helper::TestGit;
pub use service::{TestService, TestUpstream};

use crate::report::StatusSink;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// This function initializes the tracing subscriber for tests, but only once
/// regardless of how many times it's called. It respects the `RUST_LOG`
/// environment variable if set, or uses the provided log level.
///
/// # Arguments
///
/// * `level` - Optional log level to use. If None, uses `RUST_LOG` environment variable
///
/// To enable logging in tests via environment variable:
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            // No logging if neither is provided
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer() // Important: uses test-compatible writer
            .with_target(true) // Show module targets like "session"
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Status sink that records every report, in order.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSink for MemorySink {
    async fn report(&self, text: &str) -> Result<()> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Status sink that rejects every report.
///
/// Sessions must absorb reporting failures, so tests pair this sink with a
/// run that is expected to succeed anyway.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingSink;

#[async_trait]
impl StatusSink for FailingSink {
    async fn report(&self, _text: &str) -> Result<()> {
        anyhow::bail!("status channel offline")
    }
}
