//! Integration tests for the `netsight` CLI binary.
//!
//! Argument parsing, help output and completions run without a backend;
//! data commands run against a wiremock GraphQL endpoint.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `netsight` binary with env isolation.
///
/// Clears all `NETSIGHT_*` env vars and points the config file at a
/// nonexistent path so tests never touch the user's real configuration.
fn netsight_cmd() -> assert_cmd::Command {
    netsight_cmd_with_config(Path::new("/tmp/netsight-cli-test-nonexistent/config.toml"))
}

fn netsight_cmd_with_config(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("netsight");
    cmd.env("HOME", "/tmp/netsight-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/netsight-cli-test-nonexistent")
        .env("NETSIGHT_CONFIG", config)
        .env_remove("NETSIGHT_PROFILE")
        .env_remove("NETSIGHT_ENDPOINT")
        .env_remove("NETSIGHT_REALTIME_ENDPOINT")
        .env_remove("NETSIGHT_API_KEY")
        .env_remove("NETSIGHT_OUTPUT")
        .env_remove("NETSIGHT_INSECURE")
        .env_remove("NETSIGHT_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn page(items: Value, next_token: Option<&str>) -> Value {
    json!({ "data": { "listDevices": { "items": items, "nextToken": next_token } } })
}

/// Two pages: `[AA:01, AA:02]` with cursor `t1`, then `[AA:03]`.
async fn two_page_backend() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "variables": { "nextToken": "t1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{ "macAddress": "AA:BB:CC:00:00:03", "deviceCategory": "Printer" }]),
            None,
        )))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "operationName": "ListDevices" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([
                {
                    "macAddress": "AA:BB:CC:00:00:01",
                    "fqdn": "cam-1.lan",
                    "deviceCategory": "Camera",
                    "iotEndpoint": "IOT_ENDPOINT",
                    "alarmCount": 2
                },
                { "macAddress": "AA:BB:CC:00:00:02", "fqdn": "NOT_FOUND" }
            ]),
            Some("t1"),
        )))
        .mount(&server)
        .await;

    server
}

fn endpoint(server: &MockServer) -> String {
    format!("{}/graphql", server.uri())
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = netsight_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    netsight_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("devices")
            .and(predicate::str::contains("report"))
            .and(predicate::str::contains("view"))
            .and(predicate::str::contains("seed")),
    );
}

#[test]
fn test_version_flag() {
    netsight_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("netsight"));
}

#[test]
fn test_invalid_subcommand() {
    netsight_cmd()
        .arg("frobnicate")
        .assert()
        .failure()
        .code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions() {
    for shell in ["bash", "zsh", "fish"] {
        netsight_cmd()
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::is_empty().not());
    }
}

// ── Configuration errors ────────────────────────────────────────────

#[test]
fn test_devices_without_endpoint_is_usage_error() {
    let output = netsight_cmd().args(["devices", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("No backend endpoint"), "got:\n{text}");
}

#[test]
fn test_unknown_profile_is_not_found() {
    let output = netsight_cmd()
        .args(["--profile", "nope", "devices", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_bad_filter_is_usage_error() {
    let output = netsight_cmd()
        .args([
            "devices",
            "list",
            "--endpoint",
            "http://127.0.0.1:9/graphql",
            "--filter",
            "nonsense",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_config_show_redacts_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        r#"
default_profile = "lab"

[profiles.lab]
endpoint = "https://lab.example.com/graphql"
api_key = "super-secret-key"
page_size = 250
"#,
    )
    .unwrap();

    netsight_cmd_with_config(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.lab]")
                .and(predicate::str::contains("page_size = 250"))
                .and(predicate::str::contains("****"))
                .and(predicate::str::contains("super-secret-key").not()),
        );
}

// ── Backend-bound commands ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_json_has_every_page_in_order() {
    let server = two_page_backend().await;

    let output = netsight_cmd()
        .args(["devices", "list", "--output", "json-compact"])
        .args(["--endpoint", &endpoint(&server), "--api-key", "test-key"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let devices: Value = serde_json::from_slice(&output.stdout).unwrap();
    let macs: Vec<&str> = devices
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["macAddress"].as_str().unwrap())
        .collect();
    assert_eq!(
        macs,
        ["AA:BB:CC:00:00:01", "AA:BB:CC:00:00:02", "AA:BB:CC:00:00:03"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_table_uses_dash_for_unknowns() {
    let server = two_page_backend().await;

    let output = netsight_cmd()
        .args(["devices", "list", "--filter", "category=camera"])
        .args(["--endpoint", &endpoint(&server)])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("MAC"));
    assert!(stdout.contains("First Seen"));
    assert!(stdout.contains("AA:BB:CC:00:00:01"));
    assert!(stdout.contains("cam-1.lan"));
    assert!(!stdout.contains("AA:BB:CC:00:00:02"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_get_and_missing() {
    let server = two_page_backend().await;

    netsight_cmd()
        .args(["devices", "get", "aa:bb:cc:00:00:03", "--output", "json"])
        .args(["--endpoint", &endpoint(&server)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Printer"));

    netsight_cmd()
        .args(["devices", "get", "FF:FF:FF:FF:FF:FF"])
        .args(["--endpoint", &endpoint(&server)])
        .assert()
        .code(4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_report_counts_raw_collection() {
    let server = two_page_backend().await;

    let output = netsight_cmd()
        .args(["report", "--customer", "Acme", "--output", "json"])
        .args(["--endpoint", &endpoint(&server)])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["customer_name"], "Acme");
    assert_eq!(report["total_devices"], 3);
    assert_eq!(report["iot_endpoints"], 1);
    assert_eq!(report["total_alarms"], 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_view_routes() {
    let server = two_page_backend().await;

    netsight_cmd()
        .args(["view", "/", "--output", "plain"])
        .args(["--endpoint", &endpoint(&server)])
        .assert()
        .success()
        .stdout(predicate::str::contains("3"));

    netsight_cmd()
        .args(["view", "/nowhere"])
        .args(["--endpoint", &endpoint(&server)])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("/nowhere"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_compact_on_empty_backend_shows_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), None)))
        .mount(&server)
        .await;

    netsight_cmd()
        .args(["devices", "compact"])
        .args(["--endpoint", &endpoint(&server)])
        .assert()
        .success()
        .stdout(predicate::str::contains("No devices yet"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_backend_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    netsight_cmd()
        .args(["devices", "list"])
        .args(["--endpoint", &endpoint(&server), "--api-key", "wrong"])
        .assert()
        .code(3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_seed_sends_sample_device() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "operationName": "CreateDevice",
            "variables": { "input": { "macAddress": "AC:CC:8E:0A:69:26" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "createDevice": { "macAddress": "AC:CC:8E:0A:69:26", "fqdn": "axis.lan" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    netsight_cmd()
        .args(["seed"])
        .args(["--endpoint", &endpoint(&server)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created device AC:CC:8E:0A:69:26"));
}
