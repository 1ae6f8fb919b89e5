//! Error handling for refit
//!
//! This module provides the error types and user-facing error reporting for the
//! updater. The error system is designed around two principles:
//! 1. **Strongly-typed errors** for precise handling inside the session
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! Two main types cooperate:
//! - [`UpdateError`] - enumerated error types for every failure mode of an update
//! - [`ErrorContext`] - wrapper that adds suggestions and details for terminal display
//!
//! # Error Categories
//!
//! - **External commands**: [`UpdateError::CommandFailed`], [`UpdateError::CommandTimeout`]
//! - **Archive download**: [`UpdateError::Network`], [`UpdateError::HttpStatus`],
//!   [`UpdateError::RedirectLoop`], [`UpdateError::RedirectMissingTarget`],
//!   [`UpdateError::ArchiveUrlMissing`]
//! - **Archive extraction**: [`UpdateError::Extraction`]
//! - **Dependency refresh**: [`UpdateError::DependencyInstall`]
//! - **Session control**: [`UpdateError::NotAuthorized`], [`UpdateError::SessionActive`]
//!
//! Fatal categories surface unchanged to the session's single failure handler;
//! only configuration preservation is absorbed at its origin (logged, never raised).
//!
//! # Examples
//!
//! ```rust,no_run
//! use refit::core::{UpdateError, user_friendly_error};
//!
//! fn sync() -> Result<(), UpdateError> {
//!     Err(UpdateError::CommandFailed {
//!         program: "git".to_string(),
//!         stderr: "could not read from remote repository".to_string(),
//!     })
//! }
//!
//! if let Err(e) = sync() {
//!     let ctx = user_friendly_error(anyhow::Error::from(e));
//!     ctx.display(); // colored error with a suggestion
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for update operations
///
/// Each variant represents one specific failure mode and carries the details
/// needed both for programmatic handling (the session decides what is fatal)
/// and for the terminal report (`user_friendly_error`).
#[derive(Error, Debug)]
pub enum UpdateError {
    /// An external command exited non-zero
    ///
    /// Raised by the command runner for every tool it drives (git, extraction
    /// tools, the package installer, the process supervisor). The message
    /// prefers captured stderr; when the tool wrote nothing there, the runner
    /// substitutes the exit status.
    #[error("'{program}' failed: {stderr}")]
    CommandFailed {
        /// Program that was invoked (e.g. "git", "npm")
        program: String,
        /// Captured stderr, or a description of the exit status
        stderr: String,
    },

    /// An external command exceeded its time bound
    #[error("'{program}' timed out after {seconds}s")]
    CommandTimeout {
        /// Program that was invoked
        program: String,
        /// The bound that was exceeded, in seconds
        seconds: u64,
    },

    /// Transport-level failure while downloading the archive
    #[error("download of '{url}' failed: {reason}")]
    Network {
        /// URL being fetched when the transfer failed
        url: String,
        /// Underlying transport error text
        reason: String,
    },

    /// The terminal response of the download was not a success status
    #[error("server returned HTTP {status} for '{url}'")]
    HttpStatus {
        /// The non-success status code
        status: u16,
        /// URL that produced it
        url: String,
    },

    /// The redirect chain exceeded its bound or revisited a URL
    #[error("too many redirects while downloading '{url}'")]
    RedirectLoop {
        /// URL at which the chain was abandoned
        url: String,
    },

    /// A redirect response carried no usable target
    #[error("redirect from '{url}' has no location")]
    RedirectMissingTarget {
        /// URL whose response was missing a `Location` header
        url: String,
    },

    /// Archive strategy selected but no archive URL is configured
    #[error("no archive URL configured and the installation is not a git checkout")]
    ArchiveUrlMissing,

    /// Every extraction provider was tried and none produced an extracted tree
    ///
    /// The Display carries the git-checkout recommendation: the status sink
    /// only ever sees the error chain, never the CLI's suggestion line.
    #[error(
        "could not extract '{archive}' (tried: {}); updating from a git checkout is recommended on this host",
        attempted.join(", ")
    )]
    Extraction {
        /// Path of the archive that resisted extraction
        archive: String,
        /// Names of every provider attempted, in probe order
        attempted: Vec<String>,
    },

    /// The package installer exited non-zero after the tree changed
    ///
    /// Always fatal: restarting against a tree whose dependencies do not match
    /// its new source is worse than staying down.
    #[error("dependency install failed: {stderr}")]
    DependencyInstall {
        /// Captured installer stderr
        stderr: String,
    },

    /// The trigger's authorization verdict was negative
    #[error("update trigger not authorized")]
    NotAuthorized,

    /// Another update session holds the installation lock
    #[error("an update session is already running (lock at {path})")]
    SessionActive {
        /// Path of the held lock file
        path: String,
    },

    /// Settings file problem
    #[error("configuration error: {message}")]
    Config {
        /// Description of what is wrong with the settings
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for UpdateError {
    fn clone(&self) -> Self {
        match self {
            Self::CommandFailed {
                program,
                stderr,
            } => Self::CommandFailed {
                program: program.clone(),
                stderr: stderr.clone(),
            },
            Self::CommandTimeout {
                program,
                seconds,
            } => Self::CommandTimeout {
                program: program.clone(),
                seconds: *seconds,
            },
            Self::Network {
                url,
                reason,
            } => Self::Network {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::HttpStatus {
                status,
                url,
            } => Self::HttpStatus {
                status: *status,
                url: url.clone(),
            },
            Self::RedirectLoop {
                url,
            } => Self::RedirectLoop {
                url: url.clone(),
            },
            Self::RedirectMissingTarget {
                url,
            } => Self::RedirectMissingTarget {
                url: url.clone(),
            },
            Self::ArchiveUrlMissing => Self::ArchiveUrlMissing,
            Self::Extraction {
                archive,
                attempted,
            } => Self::Extraction {
                archive: archive.clone(),
                attempted: attempted.clone(),
            },
            Self::DependencyInstall {
                stderr,
            } => Self::DependencyInstall {
                stderr: stderr.clone(),
            },
            Self::NotAuthorized => Self::NotAuthorized,
            Self::SessionActive {
                path,
            } => Self::SessionActive {
                path: path.clone(),
            },
            Self::Config {
                message,
            } => Self::Config {
                message: message.clone(),
            },
            // Errors that don't implement Clone collapse to Other
            Self::Io(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::Toml(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper that adds user-facing context
///
/// `ErrorContext` wraps an [`UpdateError`] and carries optional details and a
/// suggestion. This is how the CLI presents errors:
/// 1. **Error**: the main message, red
/// 2. **Details**: why it happened, yellow (optional)
/// 3. **Suggestion**: what to do about it, green (optional)
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying update error
    pub error: UpdateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new context from an [`UpdateError`] with no extra information
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion, shown green in the terminal
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining why the error occurred, shown yellow
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`]
///
/// Recognizes [`UpdateError`] variants and common standard library errors and
/// attaches tailored suggestions; anything else is shown with its full cause
/// chain so nothing is lost on the way to the terminal.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(update_error) = error.downcast_ref::<UpdateError>() {
        return create_error_context(update_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(UpdateError::Other {
                    message: format!("permission denied: {io_error}"),
                })
                .with_suggestion(
                    "Check ownership of the installation root; the updater rewrites files in place",
                )
                .with_details("The updater could not read or write a file it needed");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(UpdateError::Other {
                    message: format!("not found: {io_error}"),
                })
                .with_suggestion("Check that the installation root path is correct")
                .with_details("A required file or directory could not be found");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(UpdateError::Config {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in refit.toml: quotes, brackets, array commas")
        .with_details("The settings file could not be parsed");
    }

    // Generic error, keep the full chain for diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(UpdateError::Other {
        message,
    })
}

/// Map each [`UpdateError`] variant to a context with tailored guidance
fn create_error_context(error: UpdateError) -> ErrorContext {
    match &error {
        UpdateError::CommandFailed { program, stderr } => {
            let suggestion = match program.as_str() {
                "git" => {
                    if stderr.contains("could not read") || stderr.contains("Could not resolve") {
                        "Check network connectivity and that the remote is reachable. Try 'git fetch' manually in the installation root"
                    } else {
                        "Run the failing git command manually in the installation root for more detail"
                    }
                }
                "npm" => "Run the install command manually in the installation root to inspect its full output",
                "pm2" => "Check that the supervisor daemon is running ('pm2 ls')",
                _ => "Run the command manually for more detail",
            };
            ErrorContext::new(error.clone()).with_suggestion(suggestion)
        }

        UpdateError::CommandTimeout { program, .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Re-run the update; if '{program}' is consistently slow, investigate the host or the remote"
            ))
            .with_details("External commands are bounded so a hung tool cannot wedge the session"),

        UpdateError::Network { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check network connectivity and the archive URL, then trigger the update again")
            .with_details("Nothing was modified; a failed download leaves no partial archive behind"),

        UpdateError::HttpStatus { status, .. } => ErrorContext::new(error.clone())
            .with_suggestion(if *status == 404 {
                "Verify the archive URL points at a downloadable zip export of the project"
            } else {
                "Verify the archive URL and any access restrictions on the hosting service"
            }),

        UpdateError::RedirectLoop { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Use a direct link to the zip export; shorteners and login walls redirect indefinitely")
            .with_details("The download follows at most 5 redirects and refuses to revisit a URL"),

        UpdateError::RedirectMissingTarget { .. } => ErrorContext::new(error.clone())
            .with_suggestion("The server sent a redirect without a Location header; verify the archive URL"),

        UpdateError::ArchiveUrlMissing => ErrorContext::new(error.clone())
            .with_suggestion("Set archive_url in refit.toml, pass --archive-url, or export REFIT_ARCHIVE_URL")
            .with_details("Without git metadata the updater can only refresh from an archive snapshot"),

        UpdateError::Extraction { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Install 'unzip' or '7z' so snapshot archives can be unpacked, or convert the installation to a git checkout"),

        UpdateError::DependencyInstall { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Run the package install command manually in the installation root and fix what it reports")
            .with_details("The service was not restarted: its tree changed but its dependencies did not"),

        UpdateError::NotAuthorized => ErrorContext::new(error.clone())
            .with_suggestion("Only the configured operator may trigger an update"),

        UpdateError::SessionActive { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Wait for the running update to finish; the lock is released when it does")
            .with_details("Concurrent sessions would race on the same files and corrupt the tree"),

        UpdateError::Config { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check the TOML syntax in refit.toml"),

        _ => ErrorContext::new(error.clone()),
    }
}
