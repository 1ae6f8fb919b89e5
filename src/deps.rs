//! Dependency reinstallation after a tree update.
//!
//! Once the source tree has changed, the installed third-party modules may no
//! longer match it. The installer runs the configured package-manager command
//! in the installation root with a generous timeout. Failure is fatal for the
//! session: restarting a service whose dependencies are inconsistent with its
//! code trades one outage for a worse one.

use crate::core::UpdateError;
use crate::runner::ToolCommand;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Package installs routinely take minutes on small panels.
const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Runs the package-manager install step in the installation root.
#[derive(Debug, Clone)]
pub struct DependencyInstaller {
    root: PathBuf,
    command: Vec<String>,
}

impl DependencyInstaller {
    pub fn new<I, S>(root: impl AsRef<Path>, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: root.as_ref().to_path_buf(),
            command: command.into_iter().map(Into::into).collect(),
        }
    }

    /// Installs dependencies, mapping a non-zero exit into a dedicated error.
    pub async fn install(&self) -> Result<()> {
        let (program, args) = self.command.split_first().ok_or_else(|| UpdateError::Config {
            message: "install command is empty".to_string(),
        })?;

        let result = ToolCommand::new(program)
            .args(args.iter().map(String::as_str))
            .current_dir(&self.root)
            .with_timeout(Some(INSTALL_TIMEOUT))
            .run()
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(error) => match error.downcast_ref::<UpdateError>() {
                Some(UpdateError::CommandFailed { stderr, .. }) => {
                    Err(UpdateError::DependencyInstall {
                        stderr: stderr.clone(),
                    }
                    .into())
                }
                _ => Err(error),
            },
        }
    }
}
