//! Package registry upload.
//!
//! The registry exposes a single multipart endpoint, `POST /pkg/upload`,
//! authenticated by a `token` header. Its response body is opaque text; only
//! the HTTP status is interpreted, through [`RegistryResponse`].

mod descriptor;
mod uploader;

pub use descriptor::{DOWNLOAD_KIND, UploadDescriptor};
pub use uploader::{RegistryConfig, RegistryUploader};

use crate::error::UploadError;

/// Production upload endpoint
pub const DEFAULT_REGISTRY_URL: &str = "https://api.lance.fun/pkg/upload";

/// User agent the registry expects from release uploads
pub const DEFAULT_USER_AGENT: &str = "Lance Dev";

/// File name of the `files` part, the same for every archive and app name
pub const UPLOAD_FILE_NAME: &str = "liveserver.zip";

/// Successful upload, with the raw response kept for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub raw_response_body: String,
}

/// Outcome of one upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryResponse {
    /// 2xx
    Success {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },
    /// 4xx and any other non-2xx status below 500
    ClientError {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },
    /// 5xx
    ServerError {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },
    /// No usable response
    NetworkError(String),
}

impl RegistryResponse {
    /// Classify an HTTP status and body
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            200..=299 => RegistryResponse::Success { status, body },
            500.. => RegistryResponse::ServerError { status, body },
            _ => RegistryResponse::ClientError { status, body },
        }
    }

    /// Pass/fail decision
    pub fn into_result(self) -> Result<UploadResult, UploadError> {
        match self {
            RegistryResponse::Success { status, body } => Ok(UploadResult {
                status,
                raw_response_body: body,
            }),
            RegistryResponse::ClientError { status, body } => {
                Err(UploadError::Rejected { status, body })
            }
            RegistryResponse::ServerError { status, body } => {
                Err(UploadError::Server { status, body })
            }
            RegistryResponse::NetworkError(reason) => Err(UploadError::Network { reason }),
        }
    }
}
