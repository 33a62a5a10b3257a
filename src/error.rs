//! Error types for liveserver_release operations.
//!
//! Each pipeline stage has its own error enum so the orchestrator can tell a
//! missing toolchain apart from a compiler failure or a rejected upload. All of
//! them fold into [`ReleaseError`], which also owns the process exit code mapping.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for liveserver_release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all liveserver_release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Configuration errors (unsupported host, bad arguments)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Toolchain provisioning errors
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// Compiler invocation errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Archive creation errors
    #[error("Packaging error: {0}")]
    Package(#[from] PackageError),

    /// Registry upload errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
}

/// Configuration errors. Fatal before any target is attempted.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Host operating system has no release matrix
    #[error("Unsupported host operating system '{os}'. Releases can only be built on Windows, Linux or macOS.")]
    UnsupportedHost {
        /// OS name as reported by the runtime
        os: String,
    },

    /// A requested target triple is not part of the host matrix
    #[error("Target '{triple}' is not buildable on {host}. Available: {available}")]
    UnknownTarget {
        /// Requested triple
        triple: String,
        /// Host OS family name
        host: String,
        /// Comma separated triples of the host matrix
        available: String,
    },

    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Registry endpoint could not be parsed
    #[error("Invalid registry URL '{url}': {reason}")]
    InvalidRegistryUrl {
        /// URL as given
        url: String,
        /// Reason for the error
        reason: String,
    },
}

/// Errors raised by external command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Program is not on PATH
    #[error("'{program}' not found in PATH")]
    NotFound {
        /// Program name
        program: String,
    },

    /// Process could not be spawned
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        /// Rendered command line
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Process did not exit within its timeout and was killed
    #[error("'{command}' timed out after {timeout_secs}s")]
    TimedOut {
        /// Rendered command line
        command: String,
        /// Timeout in seconds
        timeout_secs: u64,
    },
}

/// Toolchain provisioning errors
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// A required tool is missing or could not be started
    #[error("Toolchain unavailable for {triple}: {source}")]
    ToolchainUnavailable {
        /// Target triple being prepared
        triple: String,
        /// Command failure
        #[source]
        source: CommandError,
    },

    /// A provisioning command exited with a non-zero status
    #[error("Provisioning step '{command}' failed for {triple} (exit code {code:?}):\n{stderr}")]
    StepFailed {
        /// Target triple being prepared
        triple: String,
        /// Rendered command line
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured stderr tail
        stderr: String,
    },
}

/// Compiler invocation errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Compiler could not be started or timed out
    #[error("Failed to run compiler for {triple}: {source}")]
    Invocation {
        /// Target triple
        triple: String,
        /// Command failure
        #[source]
        source: CommandError,
    },

    /// Compiler exited with a non-zero status
    #[error("Compilation failed for {triple} (exit code {code:?}):\n{output}")]
    CompilationFailed {
        /// Target triple
        triple: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured compiler output tail
        output: String,
    },

    /// Compiler succeeded but the binary is not where it should be
    #[error("Compiler reported success for {triple} but no binary exists at {}", .path.display())]
    BinaryMissing {
        /// Target triple
        triple: String,
        /// Expected binary path
        path: PathBuf,
    },
}

/// Archive creation errors
#[derive(Error, Debug)]
pub enum PackageError {
    /// Source binary is missing at archive time
    #[error("Binary not found at {}", .path.display())]
    BinaryMissing {
        /// Expected binary path
        path: PathBuf,
    },

    /// Output directory could not be created
    #[error("Failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        /// Directory path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error while writing the archive
    #[error("Failed to write archive {}: {source}", .path.display())]
    Io {
        /// Archive path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Zip encoder error
    #[error("Failed to encode archive {}: {source}", .path.display())]
    Zip {
        /// Archive path
        path: PathBuf,
        /// Underlying zip error
        #[source]
        source: zip::result::ZipError,
    },

    /// Blocking packaging task panicked or was cancelled
    #[error("Packaging task failed: {reason}")]
    Task {
        /// Reason for the error
        reason: String,
    },
}

/// Registry upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    /// Platform alias is not `<os>-<arch>`
    #[error("Platform alias '{alias}' does not split into exactly two tokens")]
    InvalidAlias {
        /// Offending alias
        alias: String,
    },

    /// Archive could not be read for upload
    #[error("Failed to read archive {}: {source}", .path.display())]
    ReadArchive {
        /// Archive path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Metadata could not be encoded
    #[error("Failed to encode upload metadata: {0}")]
    Encode(#[from] serde_json::Error),

    /// Request could not be built (client setup, header or mime values)
    #[error("Failed to prepare upload request: {reason}")]
    Request {
        /// Reason for the error
        reason: String,
    },

    /// Registry answered 4xx
    #[error("Registry rejected upload (HTTP {status}): {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Registry answered 5xx
    #[error("Registry server error (HTTP {status}): {body}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Connection, TLS or timeout failure
    #[error("Network error during upload: {reason}")]
    Network {
        /// Reason for the error
        reason: String,
    },
}

impl UploadError {
    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::Server { .. } | UploadError::Network { .. })
    }

    /// Raw registry response body, when the registry answered at all
    pub fn response_body(&self) -> Option<&str> {
        match self {
            UploadError::Rejected { body, .. } | UploadError::Server { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl ReleaseError {
    /// Process exit code for this error
    ///
    /// 1 configuration, 2 provisioning or build, 3 packaging, 4 upload.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseError::Config(_) => 1,
            ReleaseError::Provision(_) | ReleaseError::Build(_) => 2,
            ReleaseError::Package(_) => 3,
            ReleaseError::Upload(_) => 4,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Config(ConfigError::UnsupportedHost { .. }) => vec![
                "Run the release on a Windows, Linux or macOS build host".to_string(),
            ],
            ReleaseError::Config(ConfigError::UnknownTarget { available, .. }) => vec![
                format!("Pick one of the host targets: {}", available),
                "Omit --target to build the whole matrix".to_string(),
            ],
            ReleaseError::Provision(ProvisionError::ToolchainUnavailable { .. }) => vec![
                "Install rustup and make sure cargo and rustup are on PATH".to_string(),
                "On Linux, make sure apt and sudo are available to install cross compilers"
                    .to_string(),
            ],
            ReleaseError::Provision(ProvisionError::StepFailed { .. }) => vec![
                "Re-run the failing command manually to inspect the package manager output"
                    .to_string(),
                "Use --skip-provision if the toolchain is already installed".to_string(),
            ],
            ReleaseError::Build(BuildError::BinaryMissing { .. })
            | ReleaseError::Package(PackageError::BinaryMissing { .. }) => vec![
                "Check that --app-name matches the binary name produced by cargo".to_string(),
                "Check that --target-dir matches the cargo target directory".to_string(),
            ],
            ReleaseError::Upload(UploadError::Rejected { status: 401 | 403, .. }) => vec![
                "Verify the registry token is valid and allowed to publish".to_string(),
            ],
            ReleaseError::Upload(e) if e.is_retryable() => vec![
                "The registry may be temporarily unavailable; retry with --target for the failed targets"
                    .to_string(),
                "Increase LIVESERVER_RETRY_UPLOADS to retry more times".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
