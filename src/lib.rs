//! Refit - in-place updater for deployed services
//!
//! Refit brings a running installation up to date with its upstream project
//! and hands the result back to the process supervisor, without a package
//! registry or a reinstall. One pass selects a strategy, replaces the tree,
//! carries operator configuration across, refreshes dependencies, and
//! restarts the service.
//!
//! # Strategy Selection
//!
//! Refit probes the installation root once per run:
//! - A version-control checkout (with a usable git binary) is synced hard to
//!   the remote branch tip; local edits and untracked files are discarded.
//! - Anything else is overlaid with a downloaded zip snapshot, merged
//!   additively over the existing tree with an ignore list protecting
//!   runtime state.
//!
//! ## Key Properties
//!
//! - **Single-pass**: each run is one strictly sequential session; any
//!   failure ends it, and a failed update never restarts the service
//! - **Config-preserving**: protected fields captured from the live
//!   configuration are re-injected after the tree is replaced, whichever
//!   strategy ran
//! - **Serialized**: an advisory file lock rejects concurrent runs against
//!   the same root, immediately, never queued
//! - **Observable**: every step reports one status line through a sink;
//!   failures are delivered as a single bounded message
//!
//! # Core Modules
//!
//! ## Orchestration
//! - [`session`] - Single-pass update state machine and strategy selection
//! - [`cli`] - `refit run` / `refit check` command-line surface
//! - [`config`] - `refit.toml` loading and defaults
//! - [`core`] - Error taxonomy and user-facing error rendering
//!
//! ## Strategies
//! - [`git`] - Version-control sync against the remote branch tip
//! - [`archive`] - Snapshot download, extraction, and layout discovery
//! - [`merge`] - Additive overlay of the extracted tree onto the root
//!
//! ## Steps
//! - [`preserve`] - Protected-field capture and re-injection
//! - [`deps`] - Package installer invocation
//! - [`restart`] - Supervisor handoff with process-exit fallback
//! - [`report`] - Status sink trait and console spinner sink
//!
//! ## Supporting Modules
//! - [`runner`] - Timeout-bounded external command execution
//! - [`utils`] - Cross-platform path and filesystem helpers
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Update the service in the current directory
//! refit run
//!
//! # Update a fixed root from a pinned snapshot, without restarting
//! refit run --root /srv/bot --archive-url https://example.com/main.zip --no-restart
//!
//! # Inspect what a run would do
//! refit check --format json
//! ```

// Orchestration
pub mod cli;
pub mod config;
pub mod core;
pub mod session;

// Strategies
pub mod archive;
pub mod git;
pub mod merge;

// Update steps
pub mod deps;
pub mod preserve;
pub mod report;
pub mod restart;

// Supporting modules
pub mod runner;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
