//! Integration test suite for refit
//!
//! End-to-end tests that drive real git repositories, zip archives served
//! over local HTTP, and the compiled binary. Library-level scenarios go
//! through [`refit::session::UpdateSession`]; CLI-level tests invoke the
//! binary itself.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! Tests are organized by functionality area:
//! - **vcs_update**: Version-control strategy runs against a local upstream
//! - **archive_update**: Snapshot strategy runs, failure paths included
//! - **cli_surface**: Binary invocation, flags, exit codes, check output

mod archive_update;
mod cli_surface;
mod vcs_update;
