//! Refit CLI entry point
//!
//! This is the main executable for refit. It handles command-line argument
//! parsing, error display, and command execution.
//!
//! The CLI supports two commands:
//! - `run` - Perform one update pass against an installation root
//! - `check` - Report what a run would do, without changing anything

use anyhow::Result;
use clap::Parser;
use refit::cli;
use refit::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    // Execute the command
    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            // Convert to user-friendly error with context and suggestions
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
