//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `lambda-inspector` binary and verify exit
//! codes, stdout content, and stderr content.

use std::net::TcpStream;
use std::process::{Child, Command as StdCommand, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

/// Base port is derived from the process ID so parallel test binaries
/// don't collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 30000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

fn inspector() -> Command {
    let mut cmd = cargo_bin_cmd!("lambda-inspector");
    for key in [
        "LAMBDA_INSPECTOR_HOST",
        "LAMBDA_INSPECTOR_PORT",
        "LAMBDA_INSPECTOR_MOUNT",
        "LAMBDA_INSPECTOR_WS_FORWARD",
        "LAMBDA_INSPECTOR_EXECUTOR_URL",
        "LAMBDA_INSPECTOR_MAX_INVOCATIONS",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// Kills the server when dropped, even if an assertion fails first.
struct ServerGuard(Child);

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn start_server(port: u16) -> ServerGuard {
    let child = StdCommand::new(env!("CARGO_BIN_EXE_lambda-inspector"))
        .args(["serve", "--port", &port.to_string()])
        .env_remove("LAMBDA_INSPECTOR_MOUNT")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start lambda-inspector serve");
    let guard = ServerGuard(child);

    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    guard
}

#[test]
fn help_exits_0_with_description() {
    inspector()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lambda invocation inspector"));
}

#[test]
fn version_exits_0() {
    inspector()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lambda-inspector"));
}

#[test]
fn serve_rejects_http_forward_base() {
    inspector()
        .args(["serve", "--ws-forward", "http://localhost:8501/"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("scheme must be ws or wss"));
}

#[test]
fn serve_rejects_relative_mount() {
    inspector()
        .args(["serve", "--mount", "inspector"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("must start with '/'"));
}

#[test]
fn serve_rejects_invalid_env_port() {
    inspector()
        .arg("serve")
        .env("LAMBDA_INSPECTOR_PORT", "not-a-port")
        .assert()
        .failure()
        .stderr(predicate::str::contains("LAMBDA_INSPECTOR_PORT"));
}

#[test]
fn invocations_reports_unreachable_endpoint() {
    let port = next_port();
    inspector()
        .args([
            "invocations",
            "--endpoint",
            &format!("http://127.0.0.1:{}/_extension/lambda-inspector", port),
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("could not reach inspector"));
}

#[test]
fn invocations_against_fresh_server_is_empty() {
    let port = next_port();
    let _server = start_server(port);
    let endpoint = format!("http://127.0.0.1:{}/_extension/lambda-inspector", port);

    inspector()
        .args(["invocations", "--endpoint", &endpoint, "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));

    inspector()
        .args(["invocations", "--endpoint", &endpoint])
        .assert()
        .success()
        .stdout(predicate::str::contains("No invocations recorded."));
}
