//! Release builds for a single target triple.

use crate::error::BuildError;
use crate::process::{CommandRunner, CommandSpec};
use crate::target::TargetSpec;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Compiler flags applied to every target of a run
pub const STATIC_LINK_RUSTFLAGS: &str = "-C target-feature=+crt-static";

/// Environment shared by every build in a run.
///
/// Built once before the matrix loop and handed to each build by reference;
/// per-target additions (cross linkers) are layered on the command, never
/// written back here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnv {
    vars: BTreeMap<String, String>,
}

impl BuildEnv {
    /// Static-linking release environment
    pub fn release() -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("RUSTFLAGS".to_string(), STATIC_LINK_RUSTFLAGS.to_string());
        Self { vars }
    }

    /// Variables passed to the compiler
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

/// A binary produced for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// Path of the compiled binary
    pub binary_path: PathBuf,
    /// Target it was built for
    pub target: TargetSpec,
}

/// Invokes `cargo build --release` for one target.
#[derive(Debug, Clone)]
pub struct BuildExecutor {
    project_dir: PathBuf,
    target_dir: PathBuf,
    app_name: String,
    timeout: Duration,
}

impl BuildExecutor {
    /// Create an executor building `app_name` from `project_dir` into `target_dir`.
    ///
    /// A relative `target_dir` is taken relative to the current directory, not
    /// to `project_dir`, since cargo runs inside `project_dir`.
    pub fn new(
        project_dir: impl Into<PathBuf>,
        target_dir: impl Into<PathBuf>,
        app_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let target_dir = target_dir.into();
        Self {
            project_dir: project_dir.into(),
            target_dir: std::path::absolute(&target_dir).unwrap_or(target_dir),
            app_name: app_name.into(),
            timeout,
        }
    }

    /// Where cargo places the release binary for `target`.
    pub fn binary_path(&self, target: &TargetSpec) -> PathBuf {
        expected_binary_path(&self.target_dir, target, &self.app_name)
    }

    /// Build `target` in release mode.
    pub async fn build<R: CommandRunner>(
        &self,
        runner: &R,
        target: &TargetSpec,
        env: &BuildEnv,
    ) -> Result<BuildArtifact, BuildError> {
        let spec = self.command(target, env);
        log::info!("Building {}", target.triple);

        let output = runner
            .run(&spec)
            .await
            .map_err(|source| BuildError::Invocation {
                triple: target.triple.to_string(),
                source,
            })?;

        if !output.success() {
            return Err(BuildError::CompilationFailed {
                triple: target.triple.to_string(),
                code: output.code,
                output: output.diagnostics(),
            });
        }

        let binary_path = self.binary_path(target);
        if !binary_path.is_file() {
            return Err(BuildError::BinaryMissing {
                triple: target.triple.to_string(),
                path: binary_path,
            });
        }

        Ok(BuildArtifact {
            binary_path,
            target: *target,
        })
    }

    fn command(&self, target: &TargetSpec, env: &BuildEnv) -> CommandSpec {
        let mut spec = CommandSpec::new("cargo")
            .args(["build", "--release", "--target", target.triple, "--target-dir"])
            .args([self.target_dir.to_string_lossy()])
            .envs(env.vars())
            .current_dir(&self.project_dir)
            .timeout(self.timeout);

        if let Some(linker) = target.linker {
            let var = target.linker_env_var();
            // An operator-provided linker wins over the default cross gcc.
            if std::env::var_os(&var).is_none() {
                spec.envs.insert(var, linker.to_string());
            }
        }
        spec
    }
}

/// `<target_dir>/<triple>/release/<binary>`
pub fn expected_binary_path(target_dir: &Path, target: &TargetSpec, app_name: &str) -> PathBuf {
    target_dir
        .join(target.triple)
        .join("release")
        .join(target.os_family.binary_name(app_name))
}
