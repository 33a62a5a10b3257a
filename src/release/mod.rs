//! Release orchestration.
//!
//! One pass over the host's target matrix. For each target, in order:
//! provision → build → package → upload. A failing target is recorded and the
//! run moves on to the next one; the aggregate exit code reports the first
//! failure.

mod retry;

pub use retry::retry_with_backoff;

use crate::build::{BuildEnv, BuildExecutor};
use crate::cli::{RetryConfig, RuntimeConfig};
use crate::error::{ConfigError, ReleaseError, Result};
use crate::package::{ArtifactPackager, PackageArchive};
use crate::process::CommandRunner;
use crate::registry::{RegistryConfig, RegistryUploader, UploadDescriptor, UploadResult};
use crate::target::{HostOs, TargetMatrix, TargetSpec};
use crate::toolchain::ToolchainProvisioner;
use std::path::PathBuf;
use std::time::Duration;

/// Application released by default
pub const DEFAULT_APP_NAME: &str = "liveserver";

/// Everything one release run needs.
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    /// Application (binary and package id) name
    pub app_name: String,
    /// Release version, sent verbatim
    pub version: String,
    /// Registry credential, sent verbatim
    pub token: String,
    /// Build host family
    pub host: HostOs,
    /// Triples to build; empty means the whole matrix
    pub targets: Vec<String>,
    /// Cargo project to build
    pub project_dir: PathBuf,
    /// Cargo target directory
    pub target_dir: PathBuf,
    /// Archive output directory
    pub dist_dir: PathBuf,
    /// Registry connection
    pub registry: RegistryConfig,
    /// Upload retry policy
    pub retry: RetryConfig,
    /// Timeout for one `cargo build`
    pub build_timeout: Duration,
    /// Timeout for one provisioning command
    pub provision_timeout: Duration,
    /// Assume the toolchain is already installed
    pub skip_provision: bool,
    /// Build and package without uploading
    pub dry_run: bool,
}

impl ReleaseSettings {
    /// Settings with defaults for everything but the release inputs.
    pub fn new(version: impl Into<String>, token: impl Into<String>, host: HostOs) -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            version: version.into(),
            token: token.into(),
            host,
            targets: Vec::new(),
            project_dir: PathBuf::from("."),
            target_dir: PathBuf::from("target"),
            dist_dir: PathBuf::from("dist"),
            registry: RegistryConfig::default(),
            retry: RetryConfig::default(),
            build_timeout: Duration::from_secs(3600),
            provision_timeout: Duration::from_secs(1800),
            skip_provision: false,
            dry_run: false,
        }
    }

    /// Check the release inputs
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidArguments {
            reason: reason.to_string(),
        };
        if self.version.trim().is_empty() {
            return Err(invalid("release version must not be empty"));
        }
        if self.token.trim().is_empty() {
            return Err(invalid("registry token must not be empty"));
        }
        if self.app_name.is_empty() || self.app_name.contains(['/', '\\']) {
            return Err(invalid("application name must be a plain file name"));
        }
        Ok(())
    }
}

/// How far one target got.
#[derive(Debug)]
pub enum TargetStatus {
    /// Archive accepted by the registry
    Uploaded(UploadResult),
    /// Archive written, upload skipped (dry run)
    Packaged,
    /// Pipeline stopped at this error
    Failed(ReleaseError),
}

/// Result for one matrix entry.
#[derive(Debug)]
pub struct TargetOutcome {
    /// Target
    pub target: TargetSpec,
    /// Archive path, when packaging succeeded
    pub archive: Option<PathBuf>,
    /// Final status
    pub status: TargetStatus,
}

impl TargetOutcome {
    /// Whether this target failed
    pub fn is_failure(&self) -> bool {
        matches!(self.status, TargetStatus::Failed(_))
    }
}

/// Per-target results of a run, in matrix order.
#[derive(Debug, Default)]
pub struct ReleaseReport {
    /// One outcome per attempted target
    pub outcomes: Vec<TargetOutcome>,
}

impl ReleaseReport {
    /// Number of failed targets
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Whether every target made it through
    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }

    /// Exit code of the first failed target, 0 when none failed
    pub fn exit_code(&self) -> i32 {
        self.outcomes
            .iter()
            .find_map(|o| match &o.status {
                TargetStatus::Failed(e) => Some(e.exit_code()),
                _ => None,
            })
            .unwrap_or(0)
    }
}

/// Drives a release run.
#[derive(Debug)]
pub struct ReleaseOrchestrator<R> {
    settings: ReleaseSettings,
    runner: R,
}

/// Stage components shared across the matrix loop
struct Pipeline {
    env: BuildEnv,
    provisioner: ToolchainProvisioner,
    builder: BuildExecutor,
    packager: ArtifactPackager,
    uploader: RegistryUploader,
}

impl<R: CommandRunner> ReleaseOrchestrator<R> {
    /// Create an orchestrator running external commands through `runner`.
    pub fn new(settings: ReleaseSettings, runner: R) -> Self {
        Self { settings, runner }
    }

    /// Command runner used for provisioning and builds
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run the release.
    ///
    /// Returns `Err` only for failures that stop the run before any target is
    /// attempted; per-target failures are in the report.
    pub async fn run(&self, config: &RuntimeConfig) -> Result<ReleaseReport> {
        let settings = &self.settings;
        settings.validate()?;

        let targets = TargetMatrix::select(settings.host, &settings.targets)?;
        let mut pipeline = Pipeline {
            env: BuildEnv::release(),
            provisioner: ToolchainProvisioner::new(settings.host, settings.provision_timeout),
            builder: BuildExecutor::new(
                &settings.project_dir,
                &settings.target_dir,
                &settings.app_name,
                settings.build_timeout,
            ),
            packager: ArtifactPackager::new(&settings.dist_dir, &settings.app_name),
            uploader: RegistryUploader::new(&settings.registry)?,
        };
        pipeline.packager.ensure_dist_dir().await?;

        config.section(&format!(
            "Releasing {} {} on {} ({} target(s))",
            settings.app_name,
            settings.version,
            settings.host,
            targets.len()
        ));

        let mut report = ReleaseReport::default();
        for target in targets {
            config.println("");
            config.progress(&format!("{} ({})", target.alias, target.triple));

            let mut archive = None;
            let status = match self.release_target(&mut pipeline, &target, &mut archive, config).await {
                Ok(status) => status,
                Err(e) => {
                    config.error_println(&format!("{} failed: {}", target.alias, e));
                    if let ReleaseError::Upload(upload) = &e
                        && let Some(body) = upload.response_body()
                    {
                        config.response_println(body);
                    }
                    TargetStatus::Failed(e)
                }
            };
            report.outcomes.push(TargetOutcome {
                target,
                archive,
                status,
            });
        }

        self.print_summary(&report, config);
        Ok(report)
    }

    async fn release_target(
        &self,
        pipeline: &mut Pipeline,
        target: &TargetSpec,
        archive_path: &mut Option<PathBuf>,
        config: &RuntimeConfig,
    ) -> Result<TargetStatus> {
        let settings = &self.settings;

        if settings.skip_provision {
            config.verbose_println("Skipping toolchain provisioning");
        } else {
            config.verbose_println("Provisioning toolchain...");
            pipeline.provisioner.prepare(&self.runner, target).await?;
        }

        config.verbose_println("Building release binary...");
        let artifact = pipeline
            .builder
            .build(&self.runner, target, &pipeline.env)
            .await?;
        config.indent(&format!("Built {}", artifact.binary_path.display()));

        let archive = pipeline.packager.package(artifact).await?;
        *archive_path = Some(archive.archive_path.clone());
        config.indent(&format!("Packaged {}", archive.archive_path.display()));

        if settings.dry_run {
            config.indent("Dry run: upload skipped");
            return Ok(TargetStatus::Packaged);
        }

        let result = self.upload(&pipeline.uploader, &archive, config).await?;
        config.success_println(&format!(
            "Uploaded {} (HTTP {})",
            target.alias, result.status
        ));
        config.response_println(&result.raw_response_body);
        Ok(TargetStatus::Uploaded(result))
    }

    async fn upload(
        &self,
        uploader: &RegistryUploader,
        archive: &PackageArchive,
        config: &RuntimeConfig,
    ) -> Result<UploadResult> {
        let settings = &self.settings;
        let descriptor = UploadDescriptor::new(&settings.app_name, &settings.version, &archive.target)?;
        let name = format!("Upload of {}", archive.target.alias);

        let result = retry_with_backoff(
            || uploader.upload(archive, &descriptor, &settings.token),
            &settings.retry,
            &name,
            config,
        )
        .await?;
        Ok(result)
    }

    fn print_summary(&self, report: &ReleaseReport, config: &RuntimeConfig) {
        config.section("Summary");
        for outcome in &report.outcomes {
            let line = match &outcome.status {
                TargetStatus::Uploaded(r) => format!("{:<18} uploaded (HTTP {})", outcome.target.alias, r.status),
                TargetStatus::Packaged => format!("{:<18} packaged", outcome.target.alias),
                TargetStatus::Failed(e) => format!("{:<18} FAILED: {}", outcome.target.alias, first_line(&e.to_string())),
            };
            if outcome.is_failure() {
                config.error_println(&line);
            } else {
                config.success_println(&line);
            }
        }

        if report.is_success() {
            config.success_println(&format!("{} target(s) released", report.outcomes.len()));
        } else {
            config.warning_println(&format!(
                "{} of {} target(s) failed",
                report.failures(),
                report.outcomes.len()
            ));
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
