//! CLI integration tests

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::prelude::*;
use predicates::prelude::*;

fn screen_session_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_screen-session"))
}

/// Binary with config, data and runtime dirs pointed into `home`
fn isolated(home: &Path) -> Command {
    let mut cmd = screen_session_bin();
    cmd.env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_RUNTIME_DIR", home)
        .env_remove("SCREEN_SESSION_SOCKET")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_output() {
    screen_session_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("send"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("devices"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn version_output() {
    let output = screen_session_bin()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("screen-session"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    screen_session_bin().assert().failure().code(2);
}

#[test]
#[cfg(target_os = "linux")]
fn config_path_command() {
    let home = tempfile::tempdir().unwrap();
    isolated(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("screen-session"))
        .stdout(predicate::str::contains("preferences.toml"));
}

#[test]
#[cfg(target_os = "linux")]
fn config_set_then_get() {
    let home = tempfile::tempdir().unwrap();

    isolated(home.path())
        .args(["config", "set", "surface", "Screen"])
        .assert()
        .success();

    isolated(home.path())
        .args(["config", "get", "surface"])
        .assert()
        .success()
        .stdout("screen\n");
}

#[test]
fn config_get_unknown_key_fails() {
    let home = tempfile::tempdir().unwrap();
    isolated(home.path())
        .args(["config", "get", "api_key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown key"));
}

#[test]
fn config_set_invalid_surface_fails() {
    let home = tempfile::tempdir().unwrap();
    isolated(home.path())
        .args(["config", "set", "surface", "hologram"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid surface"));
}

#[test]
fn send_without_daemon_fails() {
    let home = tempfile::tempdir().unwrap();
    isolated(home.path())
        .args(["send", r#"{"kind":"status"}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No daemon running"));
}

#[test]
fn send_rejects_malformed_envelope() {
    let home = tempfile::tempdir().unwrap();
    isolated(home.path())
        .args(["send", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid envelope"));
}

#[test]
#[cfg(target_os = "linux")]
fn serve_answers_status_over_socket() {
    let home = tempfile::tempdir().unwrap();
    let socket = home.path().join("screen-session.sock");

    let mut daemon = isolated(home.path())
        .arg("serve")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to start daemon");

    let deadline = Instant::now() + Duration::from_secs(10);
    while !socket.exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }

    let result = isolated(home.path())
        .args(["send", r#"{"kind":"status"}"#])
        .output();

    let _ = daemon.kill();
    let _ = daemon.wait();

    let output = result.expect("Failed to execute send");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(r#""status":"ok""#));
    assert!(stdout.contains(r#""engine":"inactive""#));
}
