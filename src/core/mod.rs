//! Core types for refit
//!
//! Home of the error taxonomy shared by every component of the updater. The
//! session layer decides what is fatal; this module only describes what went
//! wrong and how to present it.
//!
//! # Error Handling
//!
//! - **Strongly-typed errors** ([`UpdateError`]) for precise handling in code
//! - **User-friendly contexts** ([`ErrorContext`]) with actionable suggestions
//!   for CLI users
//! - [`user_friendly_error`] converts any [`anyhow::Error`] into a displayable
//!   context, preserving the cause chain for unrecognized errors

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};
