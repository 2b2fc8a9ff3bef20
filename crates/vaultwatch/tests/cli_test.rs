//! Integration tests for the `vaultwatch` CLI binary.
//!
//! Argument parsing, config file handling, and end-to-end dashboard
//! fetches against a mock gateway. Nothing touches the user's config.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `vaultwatch` binary with env isolation.
fn vaultwatch_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("vaultwatch");
    cmd.env("HOME", "/tmp/vaultwatch-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/vaultwatch-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("VAULTWATCH_CONFIG")
        .env_remove("VAULTWATCH_FIREBASE_TOKEN");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Write a gateway config pointing at `base` and return its path.
fn write_gateway_config(dir: &Path, base: &str) -> std::path::PathBuf {
    let path = dir.join("vaultwatch.toml");
    std::fs::write(
        &path,
        format!(
            "[backend]\nkind = \"gateway\"\n\n\
             [gateway]\nbase_url = \"{base}/api\"\n\n\
             [commands]\ntransport = \"gateway\"\n\n\
             [refresh]\nfetch_retries = 0\ntimeout_secs = 2\n"
        ),
    )
    .unwrap();
    path
}

async fn mount_dashboard(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "timestamp": 1_746_086_400_000_i64, "uid": "04A1", "porte": "OUVERTE", "led": "VERTE" },
            { "timestamp": 1_746_086_409_000_i64, "uid": "04B2", "porte": "FERMEE",  "led": "ROUGE" },
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timestamp": 1_746_086_400_000_i64,
            "temp": 22.1, "hum": 48.0, "lum": 512, "mq": 95, "fire": 0
        })))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = vaultwatch_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    vaultwatch_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("watch")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("send"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_send_rejects_unknown_token() {
    vaultwatch_cmd()
        .args(["send", "UNLOCK"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown command"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("custom.toml");
    vaultwatch_cmd()
        .arg("--config")
        .arg(&file)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("vaultwatch.toml");

    vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .args(["config", "init", "--backend", "gateway", "--url", "http://10.0.0.5:8080/api"])
        .assert()
        .success();
    assert!(file.exists());

    let output = vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .args(["-o", "json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["backend"]["kind"], "gateway");
    assert_eq!(shown["gateway"]["base_url"], "http://10.0.0.5:8080/api");
    assert_eq!(shown["commands"]["transport"], "gateway");
    assert_eq!(shown["refresh"]["interval_secs"], 3);
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("vaultwatch.toml");
    std::fs::write(&file, "").unwrap();

    vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .args(["config", "init"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"));

    vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_config_show_masks_token() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("vaultwatch.toml");
    std::fs::write(&file, "[firebase]\nauth_token = \"s3cr3t\"\n").unwrap();

    vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("********").and(predicate::str::contains("s3cr3t").not()));
}

#[test]
fn test_status_without_database_url_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("missing.toml");

    vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("firebase.database_url"));
}

// ── Against a mock gateway ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json_reports_dashboard() {
    let server = MockServer::start().await;
    mount_dashboard(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_gateway_config(dir.path(), &server.uri());

    let output = vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .args(["-o", "json", "status"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["status"], "fresh");
    assert_eq!(report["snapshot"]["current"]["door"], "FERMEE");
    assert_eq!(report["snapshot"]["current"]["led"], "ROUGE");
    assert_eq!(report["snapshot"]["stats"]["open_count"], 1);
    assert_eq!(report["snapshot"]["env"]["state"], "available");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_table_renders_dashboard() {
    let server = MockServer::start().await;
    mount_dashboard(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_gateway_config(dir.path(), &server.uri());

    vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .args(["--color", "never", "status"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Door FERMEE")
                .and(predicate::str::contains("04A1"))
                .and(predicate::str::contains("Temperature 22.1")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_with_empty_log_exits_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_gateway_config(dir.path(), &server.uri());

    vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .arg("status")
        .assert()
        .code(4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_with_failing_gateway_exits_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_gateway_config(dir.path(), &server.uri());

    vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .arg("status")
        .assert()
        .code(7);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_with_error_document_exits_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/logs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "database offline" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_gateway_config(dir.path(), &server.uri());

    vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .arg("status")
        .assert()
        .code(7);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_posts_token_to_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/command"))
        .and(body_json(json!({ "cmd": "OPEN" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_gateway_config(dir.path(), &server.uri());

    vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .args(["send", "open"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sent OPEN"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_send_exits_dispatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/command"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_gateway_config(dir.path(), &server.uri());

    vaultwatch_cmd()
        .arg("-C")
        .arg(&file)
        .args(["send", "RESET"])
        .assert()
        .code(9)
        .stderr(predicate::str::contains("RESET"));
}
