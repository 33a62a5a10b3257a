//! Command line behaviour of the release binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn release_cmd() -> Command {
    let mut cmd = Command::cargo_bin("liveserver_release").unwrap();
    cmd.env_remove("LIVESERVER_TOKEN");
    cmd
}

#[test]
fn missing_inputs_is_a_configuration_error() {
    release_cmd()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("VERSION"));
}

#[test]
fn token_can_come_from_environment() {
    release_cmd()
        .args(["1.2.3", "--target", "not-a-real-triple"])
        .env("LIVESERVER_TOKEN", "tkn")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not-a-real-triple"));
}

#[test]
fn help_documents_exit_codes() {
    release_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 upload failure"));
}

#[test]
fn zero_timeout_is_rejected_before_any_work() {
    let tmp = tempfile::tempdir().unwrap();
    release_cmd()
        .current_dir(tmp.path())
        .args(["1.2.3", "tkn", "--build-timeout", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Timeouts must be greater than zero"));
    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn invalid_registry_url_is_a_configuration_error() {
    let tmp = tempfile::tempdir().unwrap();
    release_cmd()
        .current_dir(tmp.path())
        .args(["1.2.3", "tkn", "--registry-url", "ftp://example.com/upload"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid registry URL"));
}

/// Stands in for cargo: writes a binary where `cargo build` would.
#[cfg(target_os = "linux")]
const FAKE_CARGO: &str = r#"#!/bin/sh
target=""
target_dir=""
while [ $# -gt 0 ]; do
    case "$1" in
        --target) target="$2"; shift ;;
        --target-dir) target_dir="$2"; shift ;;
    esac
    shift
done
mkdir -p "$target_dir/$target/release"
printf 'fake binary' > "$target_dir/$target/release/liveserver"
"#;

/// Run one Linux target against `registry` with a fake cargo first on PATH.
#[cfg(target_os = "linux")]
fn quiet_release(work: &std::path::Path, registry: &str) -> assert_cmd::assert::Assert {
    use std::os::unix::fs::PermissionsExt;

    let bin_dir = work.join("bin");
    std::fs::create_dir_all(&bin_dir).unwrap();
    let cargo = bin_dir.join("cargo");
    std::fs::write(&cargo, FAKE_CARGO).unwrap();
    std::fs::set_permissions(&cargo, std::fs::Permissions::from_mode(0o755)).unwrap();
    let path = format!("{}:{}", bin_dir.display(), std::env::var("PATH").unwrap_or_default());

    release_cmd()
        .current_dir(work)
        .env("PATH", path)
        .env("LIVESERVER_RETRY_UPLOADS", "0")
        .args([
            "1.2.3",
            "tkn",
            "--quiet",
            "--skip-provision",
            "--target",
            "x86_64-unknown-linux-gnu",
            "--registry-url",
            registry,
        ])
        .assert()
}

#[cfg(target_os = "linux")]
#[test]
fn quiet_mode_still_prints_accepted_upload_response() {
    let tmp = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/pkg/upload")
        .with_status(200)
        .with_body("stored liveserver 1.2.3 linux-x86_64")
        .create();

    quiet_release(tmp.path(), &format!("{}/pkg/upload", server.url()))
        .success()
        .stdout(predicate::str::contains("stored liveserver 1.2.3 linux-x86_64"))
        .stdout(predicate::str::contains("Summary").not());

    mock.assert();
    assert!(tmp.path().join("dist/liveserver-linux-x86_64.zip").is_file());
}

#[cfg(target_os = "linux")]
#[test]
fn quiet_mode_still_prints_rejected_upload_response() {
    let tmp = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/pkg/upload")
        .with_status(401)
        .with_body("token expired")
        .create();

    quiet_release(tmp.path(), &format!("{}/pkg/upload", server.url()))
        .code(4)
        .stdout(predicate::str::contains("token expired"));

    mock.assert();
}
