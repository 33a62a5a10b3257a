//! Release command execution.

use super::{Args, RetryConfig, RuntimeConfig};
use crate::error::{ConfigError, Result};
use crate::process::ProcessRunner;
use crate::release::ReleaseOrchestrator;
use crate::target::HostOs;

/// Execute a release run for the parsed arguments
///
/// Returns the process exit code. Errors are configuration failures that
/// stopped the run before any target was attempted.
pub async fn execute_command(args: Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| ConfigError::InvalidArguments { reason })?;

    let config = RuntimeConfig::from(&args);

    let retry = RetryConfig::from_env();
    retry
        .validate()
        .map_err(|reason| ConfigError::InvalidArguments { reason })?;

    let host = HostOs::detect()?;
    log::info!("Detected {} build host", host);

    let settings = args.to_settings(host, retry);
    if settings.dry_run {
        config.warning_println("Dry run: archives will be built but not uploaded");
    }

    let orchestrator = ReleaseOrchestrator::new(settings, ProcessRunner);
    let report = orchestrator.run(&config).await?;

    Ok(report.exit_code())
}
