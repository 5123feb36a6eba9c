//! CLI integration tests.
//!
//! Each test points the config directory at its own temp dir, so tests
//! never touch real credentials and can run in parallel.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

mod common;

use std::io::Read;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;
use serde_json::Value;

use common::test_server::{TOKEN, TestServer};

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("leadflow").expect("failed to find binary");
        cmd.env("NO_COLOR", "1")
            .env("HOME", self.temp_dir.path())
            .env("XDG_CONFIG_HOME", self.temp_dir.path().join("config"))
            .env_remove("LEADFLOW_SERVER_URL")
            .env_remove("LEADFLOW_TOKEN")
            .env_remove("LEADFLOW_CONFIG");
        cmd
    }

    /// Command authenticated through the environment overrides.
    fn authed(&self, server: &TestServer) -> Command {
        let mut cmd = self.cmd();
        cmd.env("LEADFLOW_SERVER_URL", &server.base_url)
            .env("LEADFLOW_TOKEN", TOKEN);
        cmd
    }

    fn credentials_file(&self) -> std::path::PathBuf {
        self.temp_dir
            .path()
            .join("config")
            .join("leadflow")
            .join("credentials.toml")
    }
}

#[test]
fn test_help_lists_commands() {
    let ctx = TestContext::new();
    ctx.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("lead"))
        .stdout(predicate::str::contains("showroom"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn test_logout_without_credentials() {
    let ctx = TestContext::new();
    ctx.cmd()
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No credentials found."));
}

#[test]
fn test_commands_require_login() {
    let ctx = TestContext::new();
    ctx.cmd()
        .arg("stages")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_login_requires_server_when_non_interactive() {
    let ctx = TestContext::new();
    ctx.cmd()
        .args(["auth", "login", "--non-interactive", "--token", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--server is required"));
}

#[test]
fn test_invalid_config_rejected() {
    let ctx = TestContext::new();
    let config = ctx.temp_dir.path().join("leadflow.toml");
    std::fs::write(&config, "[export]\nconcurrency = 0\n").unwrap();

    ctx.cmd()
        .env("LEADFLOW_SERVER_URL", "http://127.0.0.1:9")
        .env("LEADFLOW_TOKEN", "abc")
        .arg("--config")
        .arg(&config)
        .arg("stages")
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_stages_logout() {
    let server = TestServer::start().await;
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["auth", "login", "--non-interactive", "--token", TOKEN, "--server"])
        .arg(&server.base_url)
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in to"));

    let creds = std::fs::read_to_string(ctx.credentials_file()).unwrap();
    assert!(creds.contains(TOKEN));
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(ctx.credentials_file())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    ctx.cmd()
        .arg("stages")
        .assert()
        .success()
        .stdout(predicate::str::contains("sold  [terminal]"));

    ctx.cmd()
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out successfully."));
    assert!(!ctx.credentials_file().exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_rejects_bad_token() {
    let server = TestServer::start().await;
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["auth", "login", "--non-interactive", "--token", "wrong", "--server"])
        .arg(&server.base_url)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not verify credentials"));
    assert!(!ctx.credentials_file().exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lead_show_json() {
    let server = TestServer::start().await;
    let ctx = TestContext::new();

    let output = ctx
        .authed(&server)
        .args(["lead", "show", "lead-1", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["lead"]["stage"], "contacted");
    assert_eq!(json["activities"][0]["type"], "note_added");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_interactive_stage_warning_not_applied() {
    let server = TestServer::start().await;
    let ctx = TestContext::new();

    ctx.authed(&server)
        .args(["lead", "stage", "lead-1", "sold", "--non-interactive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Stage change not applied"));

    ctx.authed(&server)
        .args(["lead", "stage", "lead-1", "sold", "--non-interactive", "--confirm"])
        .assert()
        .success();

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].1["confirm"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_export_archive_written() {
    let server = TestServer::start().await;
    let ctx = TestContext::new();
    let out_dir = ctx.temp_dir.path().join("exports");

    ctx.authed(&server)
        .args(["export", "lead-1", "--quiet", "--output-dir"])
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let file = std::fs::read_dir(&out_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.extension().is_some_and(|e| e == "zip"))
        .expect("zip written");
    let name = file.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("lead-avery-stone-"));

    let mut archive = zip::ZipArchive::new(std::fs::File::open(&file).unwrap()).unwrap();
    let mut body = Vec::new();
    archive
        .by_name("Income/paystub.pdf")
        .unwrap()
        .read_to_end(&mut body)
        .unwrap();
    assert_eq!(body, b"%PDF-1.4 fake");
    assert!(archive.by_name("Uncategorized/license.jpg").is_ok());
}
