//! Binary-level CLI tests
//!
//! These invoke the compiled `refit` binary and assert on exit codes and
//! terminal output. Color is disabled and ambient environment overrides are
//! stripped so assertions see stable text.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[cfg(unix)]
use refit::test_utils::{SettingsFixture, ZipFixture};

fn refit_cmd() -> Command {
    let mut cmd = Command::cargo_bin("refit").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("REFIT_ARCHIVE_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    refit_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run").and(predicate::str::contains("check")));
}

#[test]
fn test_check_text_reports_archive_strategy() {
    let root = TempDir::new().unwrap();

    refit_cmd()
        .args(["check", "--root"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("strategy: archive")
                .and(predicate::str::contains("revision: unknown"))
                .and(predicate::str::contains("not configured")),
        );
}

#[test]
fn test_check_json_is_parseable() {
    let root = TempDir::new().unwrap();

    let assert = refit_cmd()
        .args(["check", "--format", "json", "--root"])
        .arg(root.path())
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["strategy"], "archive");
    assert_eq!(report["revision"], "unknown");
    assert_eq!(report["archive_url_configured"], false);
}

#[test]
fn test_check_json_sees_configured_archive_url() {
    let root = TempDir::new().unwrap();
    std::fs::write(
        root.path().join("refit.toml"),
        "archive_url = \"https://host.example/proj/archive/main.zip\"\n",
    )
    .unwrap();

    let assert = refit_cmd()
        .args(["check", "--format", "json", "--root"])
        .arg(root.path())
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["archive_url_configured"], true);
}

#[test]
fn test_unauthorized_run_is_rejected() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("index.js"), "// untouched").unwrap();

    refit_cmd()
        .args(["run", "--unauthorized", "--root"])
        .arg(root.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not authorized"));

    let text = std::fs::read_to_string(root.path().join("index.js")).unwrap();
    assert_eq!(text, "// untouched");
}

#[test]
fn test_run_without_archive_url_fails_with_guidance() {
    let root = TempDir::new().unwrap();

    refit_cmd()
        .args(["run", "--root"])
        .arg(root.path())
        .assert()
        .failure()
        .code(1)
        .stderr(
            predicate::str::contains("no archive URL configured")
                .and(predicate::str::contains("--archive-url")),
        );
}

/// Marker-command config written next to the installation.
#[cfg(unix)]
fn write_marker_config(root: &std::path::Path) {
    std::fs::write(
        root.join("refit.toml"),
        "install_command = [\"touch\", \"installed.marker\"]\n\
         supervisor_command = [\"touch\", \"restarted.marker\"]\n",
    )
    .unwrap();
}

#[cfg(unix)]
#[test]
fn test_binary_archive_update_end_to_end() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("index.js"), "// old entry").unwrap();
    SettingsFixture::basic().write_to(root.path()).unwrap();
    write_marker_config(root.path());

    let mut zip_bytes = Vec::new();
    ZipFixture::new()
        .file("proj-main/index.js", "// new entry")
        .file("proj-main/settings.js", &SettingsFixture::upstream_defaults().content)
        .write_to_vec(&mut zip_bytes)
        .unwrap();

    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/snapshot.zip")
        .with_status(200)
        .with_body(&zip_bytes)
        .create();

    refit_cmd()
        .args(["run", "--archive-url"])
        .arg(format!("{}/snapshot.zip", server.url()))
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Update complete!")
                .and(predicate::str::contains("2 files merged"))
                .and(predicate::str::contains("2 protected fields preserved"))
                .and(predicate::str::contains("service restarted via supervisor")),
        );

    let entry = std::fs::read_to_string(root.path().join("index.js")).unwrap();
    assert_eq!(entry, "// new entry");
    let settings = std::fs::read_to_string(root.path().join("settings.js")).unwrap();
    assert!(settings.contains("ownerNumber: '15551234567'"));
    assert!(root.path().join("installed.marker").exists());
    assert!(root.path().join("restarted.marker").exists());
}

#[cfg(unix)]
#[test]
fn test_binary_no_restart_flag() {
    let root = TempDir::new().unwrap();
    write_marker_config(root.path());

    let mut zip_bytes = Vec::new();
    ZipFixture::new()
        .file("proj-main/index.js", "// new entry")
        .write_to_vec(&mut zip_bytes)
        .unwrap();

    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/snapshot.zip")
        .with_status(200)
        .with_body(&zip_bytes)
        .create();

    refit_cmd()
        .args(["run", "--no-restart", "--archive-url"])
        .arg(format!("{}/snapshot.zip", server.url()))
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("restart skipped"));

    assert!(root.path().join("installed.marker").exists());
    assert!(!root.path().join("restarted.marker").exists());
}

#[cfg(unix)]
#[test]
fn test_binary_exits_cleanly_when_supervisor_missing() {
    let root = TempDir::new().unwrap();
    std::fs::write(
        root.path().join("refit.toml"),
        "install_command = [\"touch\", \"installed.marker\"]\n\
         supervisor_command = [\"refit-test-no-such-supervisor\"]\n",
    )
    .unwrap();

    let mut zip_bytes = Vec::new();
    ZipFixture::new()
        .file("proj-main/index.js", "// new entry")
        .write_to_vec(&mut zip_bytes)
        .unwrap();

    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/snapshot.zip")
        .with_status(200)
        .with_body(&zip_bytes)
        .create();

    // No usable supervisor: the binary schedules its own exit and still
    // terminates successfully so the host environment restarts it.
    refit_cmd()
        .args(["run", "--archive-url"])
        .arg(format!("{}/snapshot.zip", server.url()))
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("restarting via process exit"));

    assert!(root.path().join("installed.marker").exists());
}
