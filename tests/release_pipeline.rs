//! End-to-end release runs against a fake toolchain and a mock registry.

use liveserver_release::error::{BuildError, CommandError, ProvisionError, ReleaseError, UploadError};
use liveserver_release::{
    CommandOutput, CommandRunner, CommandSpec, HostOs, ReleaseOrchestrator, ReleaseSettings,
    RetryConfig, RuntimeConfig, TargetStatus,
};
use mockito::{Matcher, Server};
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Pretends to be apt, rustup and cargo. Successful cargo builds drop a fake
/// binary where cargo would put the real one.
struct FakeToolchain {
    binary_name: String,
    fail_build: Option<&'static str>,
    skip_output: Option<&'static str>,
    fail_rustup: Option<&'static str>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeToolchain {
    fn new(host: HostOs) -> Self {
        Self {
            binary_name: host.binary_name("liveserver"),
            fail_build: None,
            skip_output: None,
            fail_rustup: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn built_triples(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.program == "cargo")
            .filter_map(|c| c.arg_value("--target").map(str::to_string))
            .collect()
    }
}

impl CommandRunner for FakeToolchain {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push(spec.clone());

        let failed = |stderr: &str| {
            Ok(CommandOutput {
                code: Some(101),
                stdout: String::new(),
                stderr: stderr.to_string(),
            })
        };

        match spec.program.as_str() {
            "rustup" => {
                if self.fail_rustup.is_some() && spec.args.last().map(String::as_str) == self.fail_rustup {
                    return failed("error: toolchain does not support target");
                }
            }
            "cargo" => {
                let triple = spec.arg_value("--target").unwrap_or_default();
                if Some(triple) == self.fail_build {
                    return failed("error[E0425]: cannot find value `port` in this scope");
                }
                if Some(triple) != self.skip_output {
                    // cargo resolves a relative --target-dir against its own working directory
                    let target_dir = spec.arg_value("--target-dir").unwrap_or_default();
                    let release_dir = spec
                        .current_dir
                        .clone()
                        .unwrap_or_default()
                        .join(target_dir)
                        .join(triple)
                        .join("release");
                    std::fs::create_dir_all(&release_dir).unwrap();
                    std::fs::write(release_dir.join(&self.binary_name), format!("binary for {}", triple))
                        .unwrap();
                }
            }
            _ => {}
        }

        Ok(CommandOutput {
            code: Some(0),
            ..Default::default()
        })
    }

    fn is_available(&self, _program: &str) -> bool {
        false
    }
}

fn settings(tmp: &Path, host: HostOs, endpoint: String) -> ReleaseSettings {
    let mut settings = ReleaseSettings::new("1.2.3", "tkn", host);
    settings.project_dir = tmp.join("project");
    settings.target_dir = tmp.join("target");
    settings.dist_dir = tmp.join("dist");
    settings.registry.endpoint = endpoint;
    settings.retry = RetryConfig {
        file_uploads: 0,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    };
    settings
}

fn info_json(os: &str, arch: &str) -> String {
    format!(
        r#"\{{"id":"liveserver","version":"1\.2\.3","os":"{}","arch":"{}","download":"zip"\}}"#,
        os, arch
    )
}

fn archive_entries(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut sink = Vec::new();
            entry.read_to_end(&mut sink).unwrap();
            entry.name().to_string()
        })
        .collect()
}

fn dist_files(dist: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dist)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn linux_release_builds_packages_and_uploads_every_target() {
    let mut server = Server::new_async().await;
    let tmp = tempfile::tempdir().unwrap();

    let mut mocks = Vec::new();
    for arch in ["x86", "x86_64", "aarch64"] {
        let mock = server
            .mock("POST", "/pkg/upload")
            .match_header("token", "tkn")
            .match_header("user-agent", "Lance Dev")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(info_json("linux", arch)),
                Matcher::Regex(r#"name="info"; filename="json_data""#.into()),
                Matcher::Regex(r#"name="files"; filename="liveserver\.zip""#.into()),
                Matcher::Regex("application/octet-stream".into()),
            ]))
            .with_status(200)
            .with_body(format!("ok {}", arch))
            .expect(1)
            .create_async()
            .await;
        mocks.push(mock);
    }

    let runner = FakeToolchain::new(HostOs::Linux);
    let settings = settings(tmp.path(), HostOs::Linux, format!("{}/pkg/upload", server.url()));
    let orchestrator = ReleaseOrchestrator::new(settings, runner);

    let report = orchestrator.run(&RuntimeConfig::quiet()).await.unwrap();

    for mock in &mocks {
        mock.assert_async().await;
    }
    assert!(report.is_success());
    assert_eq!(report.exit_code(), 0);

    let aliases: Vec<_> = report.outcomes.iter().map(|o| o.target.alias).collect();
    assert_eq!(aliases, ["linux-x86", "linux-x86_64", "linux-aarch64"]);
    match &report.outcomes[1].status {
        TargetStatus::Uploaded(result) => assert_eq!(result.raw_response_body, "ok x86_64"),
        other => panic!("unexpected status {:?}", other),
    }

    assert_eq!(
        dist_files(&tmp.path().join("dist")),
        [
            "liveserver-linux-aarch64.zip",
            "liveserver-linux-x86.zip",
            "liveserver-linux-x86_64.zip"
        ]
    );
    assert_eq!(
        archive_entries(&tmp.path().join("dist/liveserver-linux-x86_64.zip")),
        ["liveserver"]
    );
}

#[tokio::test]
async fn builds_run_in_matrix_order_with_static_linking() {
    let mut server = Server::new_async().await;
    let tmp = tempfile::tempdir().unwrap();
    let _mock = server
        .mock("POST", "/pkg/upload")
        .with_status(200)
        .create_async()
        .await;

    let runner = FakeToolchain::new(HostOs::Linux);
    let settings = settings(tmp.path(), HostOs::Linux, format!("{}/pkg/upload", server.url()));
    let orchestrator = ReleaseOrchestrator::new(settings, runner);
    orchestrator.run(&RuntimeConfig::quiet()).await.unwrap();

    let runner = orchestrator.runner();
    assert_eq!(
        runner.built_triples(),
        [
            "i686-unknown-linux-gnu",
            "x86_64-unknown-linux-gnu",
            "aarch64-unknown-linux-gnu"
        ]
    );

    let calls = runner.calls.lock().unwrap();
    for build in calls.iter().filter(|c| c.program == "cargo") {
        assert_eq!(build.envs["RUSTFLAGS"], "-C target-feature=+crt-static");
        assert!(build.args.contains(&"--release".to_string()));
    }
    let apt_updates = calls
        .iter()
        .filter(|c| c.display() == "apt update")
        .count();
    assert_eq!(apt_updates, 1);
}

#[tokio::test]
async fn darwin_release_produces_two_archives_without_exe_suffix() {
    let mut server = Server::new_async().await;
    let tmp = tempfile::tempdir().unwrap();
    let mock = server
        .mock("POST", "/pkg/upload")
        .match_body(Matcher::Regex(r#""os":"macos""#.into()))
        .with_status(201)
        .with_body("stored")
        .expect(2)
        .create_async()
        .await;

    let runner = FakeToolchain::new(HostOs::Darwin);
    let settings = settings(tmp.path(), HostOs::Darwin, format!("{}/pkg/upload", server.url()));
    let report = ReleaseOrchestrator::new(settings, runner)
        .run(&RuntimeConfig::quiet())
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(report.is_success());
    assert_eq!(
        dist_files(&tmp.path().join("dist")),
        ["liveserver-macos-aarch64.zip", "liveserver-macos-x86_64.zip"]
    );
    for outcome in &report.outcomes {
        let archive = outcome.archive.as_ref().unwrap();
        assert_eq!(archive_entries(archive), ["liveserver"]);
    }
}

#[tokio::test]
async fn failed_build_skips_its_upload_but_not_other_targets() {
    let mut server = Server::new_async().await;
    let tmp = tempfile::tempdir().unwrap();

    let ok_x86 = server
        .mock("POST", "/pkg/upload")
        .match_body(Matcher::Regex(info_json("linux", "x86")))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let never_x86_64 = server
        .mock("POST", "/pkg/upload")
        .match_body(Matcher::Regex(info_json("linux", "x86_64")))
        .with_status(200)
        .expect(0)
        .create_async()
        .await;
    let ok_aarch64 = server
        .mock("POST", "/pkg/upload")
        .match_body(Matcher::Regex(info_json("linux", "aarch64")))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let mut runner = FakeToolchain::new(HostOs::Linux);
    runner.fail_build = Some("x86_64-unknown-linux-gnu");
    let settings = settings(tmp.path(), HostOs::Linux, format!("{}/pkg/upload", server.url()));
    let report = ReleaseOrchestrator::new(settings, runner)
        .run(&RuntimeConfig::quiet())
        .await
        .unwrap();

    ok_x86.assert_async().await;
    never_x86_64.assert_async().await;
    ok_aarch64.assert_async().await;

    assert_eq!(report.failures(), 1);
    assert_eq!(report.exit_code(), 2);
    match &report.outcomes[1].status {
        TargetStatus::Failed(ReleaseError::Build(BuildError::CompilationFailed { triple, output, .. })) => {
            assert_eq!(triple, "x86_64-unknown-linux-gnu");
            assert!(output.contains("E0425"));
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert!(!tmp.path().join("dist/liveserver-linux-x86_64.zip").exists());
    assert!(tmp.path().join("dist/liveserver-linux-x86.zip").exists());
    assert!(tmp.path().join("dist/liveserver-linux-aarch64.zip").exists());
}

#[tokio::test]
async fn missing_build_output_is_a_build_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let mut runner = FakeToolchain::new(HostOs::Darwin);
    runner.skip_output = Some("aarch64-apple-darwin");

    let mut settings = settings(tmp.path(), HostOs::Darwin, "http://127.0.0.1:9/pkg/upload".into());
    settings.dry_run = true;
    let report = ReleaseOrchestrator::new(settings, runner)
        .run(&RuntimeConfig::quiet())
        .await
        .unwrap();

    assert!(matches!(report.outcomes[0].status, TargetStatus::Packaged));
    assert!(matches!(
        report.outcomes[1].status,
        TargetStatus::Failed(ReleaseError::Build(BuildError::BinaryMissing { .. }))
    ));
    assert_eq!(report.exit_code(), 2);
    assert_eq!(dist_files(&tmp.path().join("dist")), ["liveserver-macos-x86_64.zip"]);
}

#[tokio::test]
async fn unauthorized_upload_fails_the_run_and_keeps_the_archive() {
    let mut server = Server::new_async().await;
    let tmp = tempfile::tempdir().unwrap();
    let mock = server
        .mock("POST", "/pkg/upload")
        .with_status(401)
        .with_body(r#"{"error":"invalid token"}"#)
        .expect(1)
        .create_async()
        .await;

    let runner = FakeToolchain::new(HostOs::Linux);
    let mut settings = settings(tmp.path(), HostOs::Linux, format!("{}/pkg/upload", server.url()));
    settings.targets = vec!["x86_64-unknown-linux-gnu".to_string()];
    settings.retry.file_uploads = 3;
    let report = ReleaseOrchestrator::new(settings, runner)
        .run(&RuntimeConfig::quiet())
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(!report.is_success());
    assert_eq!(report.exit_code(), 4);
    assert!(tmp.path().join("dist/liveserver-linux-x86_64.zip").exists());
    match &report.outcomes[0].status {
        TargetStatus::Failed(ReleaseError::Upload(err)) => {
            assert!(matches!(err, UploadError::Rejected { status: 401, .. }));
            assert_eq!(err.response_body(), Some(r#"{"error":"invalid token"}"#));
        }
        other => panic!("unexpected status {:?}", other),
    }
}

#[tokio::test]
async fn server_errors_are_retried_then_reported() {
    let mut server = Server::new_async().await;
    let tmp = tempfile::tempdir().unwrap();
    let mock = server
        .mock("POST", "/pkg/upload")
        .with_status(503)
        .with_body("maintenance")
        .expect(3)
        .create_async()
        .await;

    let runner = FakeToolchain::new(HostOs::Darwin);
    let mut settings = settings(tmp.path(), HostOs::Darwin, format!("{}/pkg/upload", server.url()));
    settings.targets = vec!["aarch64-apple-darwin".to_string()];
    settings.retry.file_uploads = 2;
    let report = ReleaseOrchestrator::new(settings, runner)
        .run(&RuntimeConfig::quiet())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(report.exit_code(), 4);
    assert!(matches!(
        report.outcomes[0].status,
        TargetStatus::Failed(ReleaseError::Upload(UploadError::Server { status: 503, .. }))
    ));
}

#[tokio::test]
async fn provisioning_failure_stops_only_that_target() {
    let tmp = tempfile::tempdir().unwrap();
    let mut runner = FakeToolchain::new(HostOs::Linux);
    runner.fail_rustup = Some("aarch64-unknown-linux-gnu");

    let mut settings = settings(tmp.path(), HostOs::Linux, "http://127.0.0.1:9/pkg/upload".into());
    settings.dry_run = true;
    let orchestrator = ReleaseOrchestrator::new(settings, runner);
    let report = orchestrator.run(&RuntimeConfig::quiet()).await.unwrap();

    assert_eq!(report.exit_code(), 2);
    assert!(matches!(
        report.outcomes[2].status,
        TargetStatus::Failed(ReleaseError::Provision(ProvisionError::StepFailed { .. }))
    ));
    assert_eq!(
        orchestrator.runner().built_triples(),
        ["i686-unknown-linux-gnu", "x86_64-unknown-linux-gnu"]
    );
}

#[tokio::test]
async fn skip_provision_runs_only_builds() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeToolchain::new(HostOs::Linux);
    let mut settings = settings(tmp.path(), HostOs::Linux, "http://127.0.0.1:9/pkg/upload".into());
    settings.dry_run = true;
    settings.skip_provision = true;

    let orchestrator = ReleaseOrchestrator::new(settings, runner);
    let report = orchestrator.run(&RuntimeConfig::quiet()).await.unwrap();

    assert!(report.is_success());
    let calls = orchestrator.runner().calls.lock().unwrap();
    assert!(calls.iter().all(|c| c.program == "cargo"));
    assert_eq!(calls.len(), 3);
}

#[tokio::test]
async fn relative_project_and_target_dirs_find_the_built_binary() {
    let scratch = tempfile::tempdir_in(".").unwrap();
    let relative = scratch
        .path()
        .strip_prefix(".")
        .unwrap_or(scratch.path())
        .to_path_buf();
    assert!(relative.is_relative());

    let runner = FakeToolchain::new(HostOs::Linux);
    let mut settings = ReleaseSettings::new("1.2.3", "tkn", HostOs::Linux);
    settings.project_dir = relative.join("app");
    settings.target_dir = relative.join("app").join("target");
    settings.dist_dir = relative.join("dist");
    settings.targets = vec!["x86_64-unknown-linux-gnu".to_string()];
    settings.skip_provision = true;
    settings.dry_run = true;

    let orchestrator = ReleaseOrchestrator::new(settings, runner);
    let report = orchestrator.run(&RuntimeConfig::quiet()).await.unwrap();

    assert!(report.is_success(), "{:?}", report.outcomes[0].status);
    assert!(
        relative
            .join("app/target/x86_64-unknown-linux-gnu/release/liveserver")
            .is_file()
    );
    assert!(!relative.join("app").join(&relative).exists());
    assert_eq!(dist_files(&relative.join("dist")), ["liveserver-linux-x86_64.zip"]);
}

#[tokio::test]
async fn unknown_target_is_a_configuration_error() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeToolchain::new(HostOs::Windows);
    let mut settings = settings(tmp.path(), HostOs::Windows, "http://127.0.0.1:9/pkg/upload".into());
    settings.targets = vec!["x86_64-unknown-linux-gnu".to_string()];

    let orchestrator = ReleaseOrchestrator::new(settings, runner);
    let err = orchestrator.run(&RuntimeConfig::quiet()).await.unwrap_err();

    assert_eq!(err.exit_code(), 1);
    assert!(orchestrator.runner().calls.lock().unwrap().is_empty());
    assert!(!tmp.path().join("dist").exists());
}
