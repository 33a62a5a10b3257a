//! Retry configuration for registry uploads.
//!
//! Retry counts can be tuned from the environment for flaky networks.

use std::time::Duration;

/// Highest accepted `LIVESERVER_RETRY_UPLOADS` value
const MAX_UPLOAD_RETRIES: u32 = 10;

/// Configuration for retry behavior of network operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Max retries for archive uploads (0 = single attempt)
    pub file_uploads: u32,

    /// Wait before the first retry; doubles on each further retry
    pub initial_backoff: Duration,

    /// Upper bound for a single wait
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            file_uploads: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Parse retry count from environment variable with clamping to maximum
    ///
    /// # Arguments
    /// * `var_name` - Environment variable name (e.g., "LIVESERVER_RETRY_UPLOADS")
    /// * `default` - Default value if variable is not set or invalid
    /// * `max` - Maximum allowed value (values above this are clamped)
    fn parse_retry_env(var_name: &str, default: u32, max: u32) -> u32 {
        Self::parse_retry_value(std::env::var(var_name).ok().as_deref(), default, max)
    }

    fn parse_retry_value(value: Option<&str>, default: u32, max: u32) -> u32 {
        value
            .and_then(|s| s.trim().parse::<u32>().ok())
            .map(|v| v.min(max))
            .unwrap_or(default)
    }

    /// Create config from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        Self {
            file_uploads: Self::parse_retry_env(
                "LIVESERVER_RETRY_UPLOADS",
                Self::default().file_uploads,
                MAX_UPLOAD_RETRIES,
            ),
            ..Self::default()
        }
    }

    /// Validate retry counts are reasonable
    pub fn validate(&self) -> Result<(), String> {
        if self.file_uploads > MAX_UPLOAD_RETRIES {
            return Err(format!(
                "file_uploads retry count too high: {} (max: {})",
                self.file_uploads, MAX_UPLOAD_RETRIES
            ));
        }
        if self.initial_backoff > self.max_backoff {
            return Err("initial backoff exceeds maximum backoff".to_string());
        }
        Ok(())
    }
}
