//! Cross-compilation toolchain provisioning.
//!
//! Linux hosts install cross gcc and multilib packages through apt before the
//! first build. Every host installs the Rust standard library for each target
//! through `rustup target add`. Both are idempotent.

use crate::error::ProvisionError;
use crate::process::{CommandRunner, CommandSpec};
use crate::target::{HostOs, TargetSpec};
use std::collections::BTreeMap;
use std::time::Duration;

/// Ensures the host can build a given target.
#[derive(Debug)]
pub struct ToolchainProvisioner {
    host: HostOs,
    timeout: Duration,
    host_ready: bool,
}

impl ToolchainProvisioner {
    /// Create a provisioner for `host`; each command is killed after `timeout`.
    pub fn new(host: HostOs, timeout: Duration) -> Self {
        Self {
            host,
            timeout,
            host_ready: false,
        }
    }

    /// Prepare the toolchain for `target`.
    ///
    /// Host packages are installed once per run; a failed attempt is retried
    /// for the next target.
    pub async fn prepare<R: CommandRunner>(
        &mut self,
        runner: &R,
        target: &TargetSpec,
    ) -> Result<(), ProvisionError> {
        if !self.host_ready {
            self.install_host_packages(runner, target).await?;
            self.host_ready = true;
        }

        let rustup = CommandSpec::new("rustup")
            .args(["target", "add", target.triple])
            .timeout(self.timeout);
        self.run_step(runner, &rustup, target).await
    }

    async fn install_host_packages<R: CommandRunner>(
        &self,
        runner: &R,
        target: &TargetSpec,
    ) -> Result<(), ProvisionError> {
        let steps = self.host.provisioning_steps();
        if steps.is_empty() {
            return Ok(());
        }

        let use_sudo = runner.is_available("sudo");
        let mut env = BTreeMap::new();
        env.insert("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string());

        log::info!("Installing {} cross-compilation packages", self.host);
        for step in steps {
            let spec = if use_sudo {
                CommandSpec::new("sudo").args(step.iter().copied())
            } else {
                CommandSpec::new(step[0]).args(step[1..].iter().copied())
            };
            let spec = spec.envs(&env).timeout(self.timeout);
            self.run_step(runner, &spec, target).await?;
        }
        Ok(())
    }

    async fn run_step<R: CommandRunner>(
        &self,
        runner: &R,
        spec: &CommandSpec,
        target: &TargetSpec,
    ) -> Result<(), ProvisionError> {
        let output = runner
            .run(spec)
            .await
            .map_err(|source| ProvisionError::ToolchainUnavailable {
                triple: target.triple.to_string(),
                source,
            })?;

        if !output.success() {
            return Err(ProvisionError::StepFailed {
                triple: target.triple.to_string(),
                command: spec.display(),
                code: output.code,
                stderr: output.diagnostics(),
            });
        }
        Ok(())
    }
}
