//! Integration tests for the `junghome` binary.
//!
//! Parsing, help, completions, and config handling run without a gateway;
//! read commands run against a wiremock gateway.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// `junghome` with every `JUNGHOME_*` variable cleared and config
/// directories pointed at `home`.
fn junghome_in(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("junghome");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("JUNGHOME_PROFILE")
        .env_remove("JUNGHOME_HOST")
        .env_remove("JUNGHOME_TOKEN")
        .env_remove("JUNGHOME_OUTPUT")
        .env_remove("JUNGHOME_INSECURE")
        .env_remove("JUNGHOME_TIMEOUT");
    cmd
}

fn junghome() -> assert_cmd::Command {
    junghome_in(Path::new("/tmp/junghome-cli-test-nonexistent"))
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn catalog() -> serde_json::Value {
    json!([
        {
            "id": "f-cover",
            "type": "Position",
            "label": "Living room blind",
            "datapoints": [
                { "id": "dp-level", "type": "level", "values": [{ "key": "level", "value": "30" }] }
            ]
        },
        {
            "id": "f-light",
            "type": "OnOff",
            "label": "Hallway",
            "datapoints": [
                { "id": "dp-switch", "type": "switch", "values": [{ "key": "switch", "value": "1" }] }
            ]
        }
    ])
}

async fn gateway() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/junghome/functions/"))
        .and(header("token", "t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/junghome/config/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "system_serial": "JH-0001",
            "version_release": "2.1.0"
        })))
        .mount(&server)
        .await;
    server
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_against(server: &MockServer, args: &[&str]) -> std::process::Output {
    let mut cmd = junghome();
    cmd.args(["--host", &server.uri(), "--token", "t0ken"]).args(args);
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = junghome().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_flag() {
    junghome().arg("--help").assert().success().stdout(
        predicate::str::contains("JUNG HOME")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("cover")),
    );
}

#[test]
fn test_version_flag() {
    junghome()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("junghome"));
}

#[test]
fn test_invalid_subcommand() {
    junghome().arg("blink").assert().failure().code(2);
}

#[test]
fn test_completions_zsh() {
    junghome()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    junghome()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_cover_position_out_of_range() {
    junghome()
        .args(["cover", "f-cover", "position", "150"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_brightness_percent_out_of_range() {
    junghome()
        .args(["--host", "http://127.0.0.1:9", "--token", "t"])
        .args(["brightness", "f-light", "150", "--percent"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a percentage"));
}

#[test]
fn test_devices_without_config() {
    junghome()
        .args(["devices", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No gateway configured"));
}

#[test]
fn test_unknown_profile() {
    junghome()
        .args(["-p", "office", "devices", "list"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("office"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_follows_xdg() {
    let dir = tempfile::tempdir().unwrap();
    junghome_in(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("junghome").and(predicate::str::contains("config.toml")));
}

#[test]
fn test_config_init_then_show_masks_token() {
    let dir = tempfile::tempdir().unwrap();

    junghome_in(dir.path())
        .args(["config", "init", "--gateway", "192.168.1.20", "--plain-token", "s3cret"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved profile 'default'"));

    junghome_in(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("192.168.1.20")
                .and(predicate::str::contains("********"))
                .and(predicate::str::contains("s3cret").not()),
        );

    junghome_in(dir.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* default"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let init = ["config", "init", "--gateway", "10.0.0.2", "--token-env", "JH_TOKEN"];

    junghome_in(dir.path()).args(init).assert().success();
    junghome_in(dir.path())
        .args(init)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));
    junghome_in(dir.path()).args(init).arg("--force").assert().success();
}

// ── Against a gateway ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_plain() {
    let server = gateway().await;
    let output = run_against(&server, &["-o", "plain", "devices", "list"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "f-cover\nf-light");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_by_category() {
    let server = gateway().await;
    let output = run_against(&server, &["-o", "json", "devices", "list", "-c", "cover"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let devices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = devices
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["f-cover"]);
    assert_eq!(devices[0]["current_position"], 70);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_get_detail() {
    let server = gateway().await;
    let output = run_against(&server, &["devices", "get", "f-cover"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Living room blind"), "{stdout}");
    assert!(stdout.contains("70% open"), "{stdout}");
    assert!(stdout.contains("dp-level"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_get_unknown() {
    let server = gateway().await;
    let output = run_against(&server, &["devices", "get", "nope"]).await;
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_read_datapoint() {
    let server = gateway().await;
    Mock::given(method("GET"))
        .and(path("/api/junghome/functions/f-light/datapoints/dp-switch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{ "key": "switch", "value": "0" }]
        })))
        .mount(&server)
        .await;

    let output = run_against(&server, &["-o", "plain", "devices", "read", "f-light", "dp-switch"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hub_plain_prints_serial() {
    let server = gateway().await;
    let output = run_against(&server, &["-o", "plain", "hub"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "JH-0001");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_token_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/junghome/functions/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let output = run_against(&server, &["test"]).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("rejected"));
}
