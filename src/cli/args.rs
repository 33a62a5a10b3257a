//! Command line argument parsing and validation.
//!
//! Two positional inputs drive a release: the version and the registry token.
//! Everything else has a default matching the standard build host layout.

use super::{OutputManager, RetryConfig};
use crate::registry::{DEFAULT_REGISTRY_URL, DEFAULT_USER_AGENT, RegistryConfig, UPLOAD_FILE_NAME};
use crate::release::{DEFAULT_APP_NAME, ReleaseSettings};
use crate::target::HostOs;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Build, package and publish every target of this host
#[derive(Parser, Debug)]
#[command(
    name = "liveserver_release",
    version,
    about = "Build, package and publish release archives for every target of this host",
    long_about = "Builds the application for every target triple supported on the current host OS,
zips each binary into dist/<app>-<os>-<arch>.zip and uploads it to the package registry.

Usage:
  liveserver_release 1.2.3 $REGISTRY_TOKEN
  liveserver_release 1.2.3 $REGISTRY_TOKEN --target x86_64-unknown-linux-gnu
  liveserver_release 1.2.3 unused --dry-run

Exit codes: 0 success, 1 configuration error, 2 build failure,
3 packaging failure, 4 upload failure."
)]
pub struct Args {
    /// Release version, embedded verbatim in the upload metadata
    #[arg(id = "release_version", index = 1, value_name = "VERSION")]
    pub version: String,

    /// Registry token, sent verbatim in the `token` header
    #[arg(index = 2, value_name = "TOKEN", env = "LIVESERVER_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Application binary and package id
    #[arg(long, env = "LIVESERVER_APP_NAME", default_value = DEFAULT_APP_NAME)]
    pub app_name: String,

    /// Cargo project to build
    #[arg(long, env = "LIVESERVER_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Cargo target directory [default: <PROJECT_DIR>/target]
    #[arg(long, env = "LIVESERVER_TARGET_DIR")]
    pub target_dir: Option<PathBuf>,

    /// Archive output directory
    #[arg(long, env = "LIVESERVER_DIST_DIR", default_value = "dist")]
    pub dist_dir: PathBuf,

    /// Registry upload endpoint
    #[arg(long, env = "LIVESERVER_REGISTRY_URL", default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    /// Only build these triples (repeatable); defaults to the whole host matrix
    #[arg(long = "target", value_name = "TRIPLE")]
    pub targets: Vec<String>,

    /// Do not install cross compilers or rustup targets
    #[arg(long)]
    pub skip_provision: bool,

    /// Build and package, but do not upload
    #[arg(long)]
    pub dry_run: bool,

    /// Timeout for each cargo build, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 3600)]
    pub build_timeout: u64,

    /// Timeout for each provisioning command, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 1800)]
    pub provision_timeout: u64,

    /// Timeout for each upload request, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 120)]
    pub http_timeout: u64,

    /// Show per-step progress
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.version.trim().is_empty() {
            return Err("Release version is required".to_string());
        }
        if self.token.trim().is_empty() {
            return Err("Registry token is required".to_string());
        }
        if self.build_timeout == 0 || self.provision_timeout == 0 || self.http_timeout == 0 {
            return Err("Timeouts must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Release settings for `host`
    pub fn to_settings(&self, host: HostOs, retry: RetryConfig) -> ReleaseSettings {
        let target_dir = self
            .target_dir
            .clone()
            .unwrap_or_else(|| self.project_dir.join("target"));

        ReleaseSettings {
            app_name: self.app_name.clone(),
            version: self.version.clone(),
            token: self.token.clone(),
            host,
            targets: self.targets.clone(),
            project_dir: self.project_dir.clone(),
            target_dir,
            dist_dir: self.dist_dir.clone(),
            registry: RegistryConfig {
                endpoint: self.registry_url.clone(),
                user_agent: DEFAULT_USER_AGENT.to_string(),
                upload_file_name: UPLOAD_FILE_NAME.to_string(),
                timeout: Duration::from_secs(self.http_timeout),
            },
            retry,
            build_timeout: Duration::from_secs(self.build_timeout),
            provision_timeout: Duration::from_secs(self.provision_timeout),
            skip_provision: self.skip_provision,
            dry_run: self.dry_run,
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: OutputManager::new(verbose, quiet),
        }
    }

    /// Configuration that prints only errors
    pub fn quiet() -> Self {
        Self::new(false, true)
    }

    /// Print message
    pub fn println(&self, message: &str) {
        self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        self.output.success(message);
    }

    /// Print progress message
    pub fn progress(&self, message: &str) {
        self.output.progress(message);
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        self.output.indent(message);
    }

    /// Print a registry response body (shown even in quiet mode)
    pub fn response_println(&self, body: &str) {
        self.output.response(body);
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}
