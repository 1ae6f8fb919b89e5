//! Archive strategy integration tests
//!
//! Each test serves a zip snapshot from a local HTTP server and runs a full
//! session against an installation that carries no version-control metadata.

use anyhow::Result;
use refit::config::UpdateConfig;
use refit::core::UpdateError;
use refit::session::{Strategy, UpdateSession};
use refit::test_utils::{MemorySink, TestService, ZipFixture, init_test_logging};

#[cfg(unix)]
use refit::restart::RestartOutcome;
#[cfg(unix)]
use refit::test_utils::SettingsFixture;

#[cfg(unix)]
#[tokio::test]
async fn test_snapshot_update_with_wrapper_folder() -> Result<()> {
    init_test_logging(None);

    let service = TestService::new()?;
    service.write_file("index.js", "// old entry")?;
    service.write_file("data/session.json", r#"{"active":true}"#)?;
    SettingsFixture::basic().write_to(service.root())?;

    // Hosting-service export: everything under one wrapper folder, shipped
    // dependency and state directories included.
    let mut zip_bytes = Vec::new();
    ZipFixture::new()
        .file("proj-main/index.js", "// new entry")
        .file("proj-main/plugins/welcome.js", "module.exports = 1;")
        .file("proj-main/settings.js", &SettingsFixture::upstream_defaults().content)
        .file("proj-main/node_modules/left-pad/index.js", "// shipped dep")
        .file("proj-main/data/stale.json", "{}")
        .write_to_vec(&mut zip_bytes)?;

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/snapshot.zip")
        .with_status(200)
        .with_body(&zip_bytes)
        .create_async()
        .await;

    let config = UpdateConfig {
        install_command: vec!["touch".into(), "installed.marker".into()],
        supervisor_command: vec!["touch".into(), "restarted.marker".into()],
        ..UpdateConfig::default()
    };
    let sink = MemorySink::new();
    let summary = UpdateSession::new(service.root(), &config, &sink)
        .with_archive_override(Some(format!("{}/snapshot.zip", server.url())))
        .run()
        .await?;

    assert_eq!(summary.strategy, Strategy::Archive);
    assert!(summary.delta.is_none());
    assert_eq!(summary.copied_files, ["index.js", "plugins/welcome.js", "settings.js"]);

    // The wrapper folder was unwrapped, not copied as a directory.
    assert!(!service.root().join("proj-main").exists());
    assert_eq!(std::fs::read_to_string(service.root().join("index.js"))?, "// new entry");
    assert!(service.root().join("plugins/welcome.js").exists());

    // Ignored names never cross over; live runtime state survives.
    assert!(!service.root().join("node_modules").exists());
    assert!(!service.root().join("data/stale.json").exists());
    assert_eq!(
        std::fs::read_to_string(service.root().join("data/session.json"))?,
        r#"{"active":true}"#
    );

    // Incoming settings landed, protected fields were re-injected.
    assert_eq!(summary.preserved_fields, 2);
    let text = std::fs::read_to_string(service.root().join("settings.js"))?;
    assert!(text.contains("ownerNumber: '15551234567'"));
    assert!(text.contains("botOwner: 'Operator Prime'"));
    assert!(text.contains("prefix: '!'"));

    // Scratch artifacts are gone before the session returns.
    assert!(!service.root().join("tmp/update.zip").exists());
    assert!(!service.root().join("tmp/update_extract").exists());

    assert!(service.root().join("installed.marker").exists());
    assert!(service.root().join("restarted.marker").exists());
    assert_eq!(summary.restart, RestartOutcome::Supervised);

    let messages = sink.messages();
    assert!(messages.iter().any(|text| text == "downloading update archive"));
    assert!(messages.iter().any(|text| text == "merging update into installation"));
    assert!(messages.iter().any(|text| text == "merged 3 files"));
    Ok(())
}

#[tokio::test]
async fn test_redirect_cycle_leaves_installation_untouched() -> Result<()> {
    init_test_logging(None);

    let service = TestService::new()?;
    service.write_file("index.js", "// untouched v1")?;

    let mut server = mockito::Server::new_async().await;
    let _a = server
        .mock("GET", "/a")
        .with_status(302)
        .with_header("location", "/b")
        .create_async()
        .await;
    let _b = server
        .mock("GET", "/b")
        .with_status(302)
        .with_header("location", "/a")
        .create_async()
        .await;

    let config = UpdateConfig {
        install_command: vec!["refit-test-never-runs".into()],
        supervisor_command: vec!["refit-test-never-runs".into()],
        ..UpdateConfig::default()
    };
    let sink = MemorySink::new();
    let error = UpdateSession::new(service.root(), &config, &sink)
        .with_archive_override(Some(format!("{}/a", server.url())))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        error.downcast_ref::<UpdateError>(),
        Some(UpdateError::RedirectLoop { .. })
    ));
    assert_eq!(std::fs::read_to_string(service.root().join("index.js"))?, "// untouched v1");
    assert!(!service.root().join("tmp/update.zip").exists());
    assert!(!service.root().join("tmp/update_extract").exists());

    let last = sink.messages().pop().expect("failure is reported");
    assert!(last.starts_with("update failed:\n"));
    assert!(last.contains("too many redirects"));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_install_blocks_restart() -> Result<()> {
    init_test_logging(None);

    let service = TestService::new()?;
    service.write_file("index.js", "// old entry")?;

    let mut zip_bytes = Vec::new();
    ZipFixture::new()
        .file("proj-main/index.js", "// new entry")
        .write_to_vec(&mut zip_bytes)?;

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/snapshot.zip")
        .with_status(200)
        .with_body(&zip_bytes)
        .create_async()
        .await;

    let config = UpdateConfig {
        install_command: vec![
            "sh".into(),
            "-c".into(),
            "echo dependency conflict >&2; exit 1".into(),
        ],
        supervisor_command: vec!["touch".into(), "restarted.marker".into()],
        ..UpdateConfig::default()
    };
    let sink = MemorySink::new();
    let error = UpdateSession::new(service.root(), &config, &sink)
        .with_archive_override(Some(format!("{}/snapshot.zip", server.url())))
        .run()
        .await
        .unwrap_err();

    match error.downcast_ref::<UpdateError>() {
        Some(UpdateError::DependencyInstall { stderr }) => {
            assert!(stderr.contains("dependency conflict"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The merge is not rolled back, but the restart never happens.
    assert_eq!(std::fs::read_to_string(service.root().join("index.js"))?, "// new entry");
    assert!(!service.root().join("restarted.marker").exists());

    let last = sink.messages().pop().expect("failure is reported");
    assert!(last.starts_with("update failed:\n"));
    assert!(last.contains("dependency conflict"));
    Ok(())
}
