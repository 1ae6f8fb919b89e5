//! Version-control strategy integration tests
//!
//! Each test runs a full update session against a real local upstream
//! repository. All of them skip silently when no git client is installed
//! on the host.

use anyhow::Result;
use refit::config::UpdateConfig;
use refit::git::is_git_installed;
use refit::session::{Strategy, UpdateSession};
use refit::test_utils::{MemorySink, TestService, init_test_logging};

#[cfg(unix)]
use refit::restart::RestartOutcome;
#[cfg(unix)]
use refit::test_utils::{FailingSink, SettingsFixture};

/// Config whose install and supervisor commands drop marker files instead of
/// invoking npm or pm2.
#[cfg(unix)]
fn marker_config() -> UpdateConfig {
    UpdateConfig {
        install_command: vec!["touch".into(), "installed.marker".into()],
        supervisor_command: vec!["touch".into(), "restarted.marker".into()],
        ..UpdateConfig::default()
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_update_behind_by_two_commits() -> Result<()> {
    init_test_logging(None);
    if !is_git_installed() {
        return Ok(());
    }

    let service = TestService::new()?;
    let upstream = service.init_upstream()?;
    upstream.commit_file("index.js", "// v1", "initial")?;
    service.clone_from(&upstream)?;

    upstream.commit_file("plugins/welcome.js", "module.exports = 1;", "add welcome plugin")?;
    let tip = upstream.commit_file("index.js", "// v2", "bump entry point")?;

    let config = marker_config();
    let sink = MemorySink::new();
    let summary = UpdateSession::new(service.root(), &config, &sink).run().await?;

    assert_eq!(summary.strategy, Strategy::Vcs);
    let delta = summary.delta.expect("vcs run carries a delta");
    assert!(!delta.up_to_date);
    assert_eq!(delta.new_revision, tip);
    assert_eq!(delta.commits.len(), 2);

    // The tree moved and both post-update steps ran.
    assert_eq!(std::fs::read_to_string(service.root().join("index.js"))?, "// v2");
    assert!(service.root().join("plugins/welcome.js").exists());
    assert!(service.root().join("installed.marker").exists());
    assert!(service.root().join("restarted.marker").exists());
    assert_eq!(summary.restart, RestartOutcome::Supervised);

    let messages = sink.messages();
    assert_eq!(messages.first().map(String::as_str), Some("updating service, please wait"));
    assert!(messages.iter().any(|text| text.contains("2 new commits")));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_up_to_date_tree_still_installs_and_restarts() -> Result<()> {
    init_test_logging(None);
    if !is_git_installed() {
        return Ok(());
    }

    let service = TestService::new()?;
    let upstream = service.init_upstream()?;
    upstream.commit_file("index.js", "// v1", "initial")?;
    service.clone_from(&upstream)?;

    let config = marker_config();
    let sink = MemorySink::new();
    let summary = UpdateSession::new(service.root(), &config, &sink).run().await?;

    let delta = summary.delta.expect("vcs run carries a delta");
    assert!(delta.up_to_date);
    // Being current is not a reason to skip the refresh steps.
    assert!(service.root().join("installed.marker").exists());
    assert!(service.root().join("restarted.marker").exists());
    assert_eq!(summary.restart, RestartOutcome::Supervised);
    assert!(sink.messages().iter().any(|text| text.contains("already up to date")));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_operator_settings_survive_sync() -> Result<()> {
    init_test_logging(None);
    if !is_git_installed() {
        return Ok(());
    }

    let service = TestService::new()?;
    let upstream = service.init_upstream()?;
    upstream.commit_file(
        "settings.js",
        &SettingsFixture::upstream_defaults().content,
        "ship default settings",
    )?;
    upstream.commit_file("index.js", "// v1", "initial")?;
    service.clone_from(&upstream)?;

    // The operator customized the live settings; the sync would otherwise
    // reset them to the committed defaults.
    SettingsFixture::basic().write_to(service.root())?;
    upstream.commit_file("index.js", "// v2", "bump entry point")?;

    let config = marker_config();
    let sink = MemorySink::new();
    let summary = UpdateSession::new(service.root(), &config, &sink).run().await?;

    assert_eq!(summary.preserved_fields, 2);
    let text = std::fs::read_to_string(service.root().join("settings.js"))?;
    assert!(text.contains("ownerNumber: '15551234567'"));
    assert!(text.contains("botOwner: 'Operator Prime'"));
    // Unprotected fields take the incoming values.
    assert!(text.contains("prefix: '!'"));
    assert!(sink.messages().iter().any(|text| text.contains("restoring protected configuration")));
    Ok(())
}

#[tokio::test]
async fn test_sync_failure_skips_install_and_restart() -> Result<()> {
    init_test_logging(None);
    if !is_git_installed() {
        return Ok(());
    }

    let service = TestService::new()?;
    let upstream = service.init_upstream()?;
    upstream.commit_file("index.js", "// v1", "initial")?;
    service.clone_from(&upstream)?;
    std::fs::remove_dir_all(upstream.path())?;

    let config = UpdateConfig {
        install_command: vec!["refit-test-never-runs".into()],
        supervisor_command: vec!["refit-test-never-runs".into()],
        ..UpdateConfig::default()
    };
    let sink = MemorySink::new();
    let error = UpdateSession::new(service.root(), &config, &sink)
        .run()
        .await
        .unwrap_err();

    assert!(format!("{error:#}").contains("git fetch failed"));
    // Fetch failed before any reset, so the tree is untouched.
    assert_eq!(std::fs::read_to_string(service.root().join("index.js"))?, "// v1");
    let messages = sink.messages();
    assert!(messages.last().expect("failure is reported").starts_with("update failed:\n"));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_disabled_restart_not_announced() -> Result<()> {
    init_test_logging(None);
    if !is_git_installed() {
        return Ok(());
    }

    let service = TestService::new()?;
    let upstream = service.init_upstream()?;
    upstream.commit_file("index.js", "// v1", "initial")?;
    service.clone_from(&upstream)?;

    let config = UpdateConfig {
        install_command: vec!["true".into()],
        restart: false,
        ..UpdateConfig::default()
    };
    let sink = MemorySink::new();
    let summary = UpdateSession::new(service.root(), &config, &sink).run().await?;

    assert_eq!(summary.restart, RestartOutcome::Skipped);
    let messages = sink.messages();
    assert_eq!(
        messages.last().map(String::as_str),
        Some("update complete, restart skipped")
    );
    assert!(!messages.iter().any(|text| text.contains("restarting service")));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_broken_status_channel_does_not_fail_the_run() -> Result<()> {
    init_test_logging(None);
    if !is_git_installed() {
        return Ok(());
    }

    let service = TestService::new()?;
    let upstream = service.init_upstream()?;
    upstream.commit_file("index.js", "// v1", "initial")?;
    service.clone_from(&upstream)?;

    let config = UpdateConfig {
        install_command: vec!["true".into()],
        restart: false,
        ..UpdateConfig::default()
    };
    let summary = UpdateSession::new(service.root(), &config, &FailingSink)
        .run()
        .await?;

    assert_eq!(summary.strategy, Strategy::Vcs);
    assert_eq!(summary.restart, RestartOutcome::Skipped);
    Ok(())
}
