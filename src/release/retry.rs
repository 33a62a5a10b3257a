//! Retry logic with exponential backoff for registry uploads.

use crate::cli::{RetryConfig, RuntimeConfig};
use crate::error::UploadError;
use std::future::Future;
use tokio::time::Duration;

/// Retry an upload with exponential backoff.
///
/// Server and network failures are retried (`initial_backoff`, then doubling,
/// capped at `max_backoff`); rejections are returned at once.
///
/// # Arguments
/// * `operation` - Async closure performing one attempt
/// * `retry` - Retry budget and backoff bounds (0 retries = try once)
/// * `operation_name` - Human-readable name for operator output
/// * `config` - Runtime config for user messaging
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    retry: &RetryConfig,
    operation_name: &str,
    config: &RuntimeConfig,
) -> Result<T, UploadError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UploadError>>,
{
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempts > 0 {
                    config.success_println(&format!(
                        "{} succeeded after {} retry(ies)",
                        operation_name, attempts
                    ));
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_retryable() || attempts >= retry.file_uploads {
                    return Err(e);
                }

                attempts += 1;
                let wait = backoff(retry, attempts);

                config.warning_println(&format!(
                    "{} failed (attempt {}/{}): {}",
                    operation_name,
                    attempts,
                    retry.file_uploads + 1,
                    e
                ));
                config.indent(&format!("Retrying in {:.1}s...", wait.as_secs_f64()));

                tokio::time::sleep(wait).await;
            }
        }
    }
}

/// Wait before retry number `attempt` (1-based)
fn backoff(retry: &RetryConfig, attempt: u32) -> Duration {
    retry
        .initial_backoff
        .saturating_mul(2u32.saturating_pow(attempt - 1))
        .min(retry.max_backoff)
}
