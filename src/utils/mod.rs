//! Cross-platform utilities and helpers.
//!
//! # Modules
//!
//! - [`fs`] - Directory creation, tolerant removal, and bounded truncation
//! - [`platform`] - Platform detection, tool lookup, and path resolution

pub mod fs;
pub mod platform;

pub use fs::{ensure_dir, ensure_parent_dir, remove_dir_all, truncate_chars};
pub use platform::{command_exists, get_git_command, is_windows, resolve_path, unix_path_string};
