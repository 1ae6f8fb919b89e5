//! Process restart handoff.
//!
//! The preferred path asks a persistent supervisor to restart everything it
//! manages. When no supervisor is reachable the process schedules its own
//! exit instead, relying on the hosting environment's auto-restart of an
//! exited process. Neither path verifies that the replacement process comes
//! up healthy; this is a handoff, not a health check.
//!
//! The actual `exit(0)` happens at the binary boundary (see
//! [`exit_after_flush`]), never inside the session, so library callers and
//! tests observe an outcome value instead of a dead process.

use crate::runner::ToolCommand;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Delay before the fallback exit so pending output can flush.
pub const FLUSH_DELAY: Duration = Duration::from_millis(500);

/// How the restart request was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    /// The supervisor accepted the restart request.
    Supervised,
    /// No supervisor was usable; the caller should exit and let the host
    /// environment bring the process back.
    ExitScheduled,
    /// Restarting is disabled by configuration.
    Skipped,
}

/// Requests a process restart after a successful update.
#[derive(Debug, Clone)]
pub struct Restarter {
    root: PathBuf,
    command: Vec<String>,
    enabled: bool,
}

impl Restarter {
    pub fn new<I, S>(root: impl AsRef<Path>, command: I, enabled: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: root.as_ref().to_path_buf(),
            command: command.into_iter().map(Into::into).collect(),
            enabled,
        }
    }

    /// Attempts the supervisor restart, falling back to a scheduled exit.
    pub async fn restart(&self) -> RestartOutcome {
        if !self.enabled {
            tracing::info!(target: "restart", "restart disabled, skipping");
            return RestartOutcome::Skipped;
        }

        let Some((program, args)) = self.command.split_first() else {
            tracing::warn!(target: "restart", "no supervisor command configured");
            return RestartOutcome::ExitScheduled;
        };

        let result = ToolCommand::new(program)
            .args(args.iter().map(String::as_str))
            .current_dir(&self.root)
            .run()
            .await;

        match result {
            Ok(()) => {
                tracing::info!(target: "restart", "supervisor restart requested via {program}");
                RestartOutcome::Supervised
            }
            Err(error) => {
                tracing::warn!(
                    target: "restart",
                    "supervisor unavailable ({error:#}), scheduling process exit"
                );
                RestartOutcome::ExitScheduled
            }
        }
    }
}

/// Sleeps for [`FLUSH_DELAY`], then exits the process successfully.
///
/// Only the binary entry point calls this, after printing its final output.
pub async fn exit_after_flush() -> ! {
    tokio::time::sleep(FLUSH_DELAY).await;
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_disabled_restart_is_skipped() {
        let temp = TempDir::new().unwrap();
        let restarter = Restarter::new(temp.path(), ["pm2", "restart", "all"], false);

        assert_eq!(restarter.restart().await, RestartOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_empty_command_schedules_exit() {
        let temp = TempDir::new().unwrap();
        let restarter = Restarter::new(temp.path(), Vec::<String>::new(), true);

        assert_eq!(restarter.restart().await, RestartOutcome::ExitScheduled);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_supervisor_success() {
        let temp = TempDir::new().unwrap();
        let restarter = Restarter::new(temp.path(), ["true"], true);

        assert_eq!(restarter.restart().await, RestartOutcome::Supervised);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_supervisor_failure_falls_back() {
        let temp = TempDir::new().unwrap();
        let restarter = Restarter::new(temp.path(), ["false"], true);

        assert_eq!(restarter.restart().await, RestartOutcome::ExitScheduled);
    }

    #[tokio::test]
    async fn test_missing_supervisor_binary_falls_back() {
        let temp = TempDir::new().unwrap();
        let restarter =
            Restarter::new(temp.path(), ["definitely-not-a-supervisor-xyz"], true);

        assert_eq!(restarter.restart().await, RestartOutcome::ExitScheduled);
    }
}
