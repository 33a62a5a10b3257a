//! Command line interface for liveserver_release.
//!
//! Parses arguments, wires the release pipeline to real processes and the
//! registry, and turns the run report into an exit code.

mod args;
mod commands;
mod output;
mod retry_config;

pub use args::{Args, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;
pub use retry_config::RetryConfig;

use crate::error::Result;

/// Main CLI entry point
///
/// Argument errors exit with 1; `--help` and `--version` exit with 0.
pub async fn run() -> Result<i32> {
    let args = match Args::try_parse_args() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return Ok(if e.use_stderr() { 1 } else { 0 });
        }
    };
    execute_command(args).await
}
