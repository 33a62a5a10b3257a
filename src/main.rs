//! liveserver_release - build, package and publish liveserver for every target of this host.
//!
//! Exit codes: 0 success, 1 configuration error, 2 build failure,
//! 3 packaging failure, 4 upload failure.

use liveserver_release::cli;
use liveserver_release::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // Never quiet for fatal errors
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    output.indent(&suggestion);
                }
            }

            process::exit(e.exit_code());
        }
    }
}
