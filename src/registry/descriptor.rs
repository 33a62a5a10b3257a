//! Upload metadata sent in the `info` part.

use crate::error::UploadError;
use crate::target::TargetSpec;
use serde::Serialize;

/// Archive format announced to the registry
pub const DOWNLOAD_KIND: &str = "zip";

/// Package metadata for one uploaded archive.
///
/// Serializes to `{"id", "version", "os", "arch", "download"}` in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadDescriptor {
    /// Package identifier
    pub id: String,
    /// Release version, verbatim from the caller
    pub version: String,
    /// OS half of the platform alias
    pub os: String,
    /// Architecture half of the platform alias
    pub arch: String,
    /// Archive format
    pub download: &'static str,
}

impl UploadDescriptor {
    /// Describe `target` as release `version` of package `id`.
    pub fn new(id: &str, version: &str, target: &TargetSpec) -> Result<Self, UploadError> {
        let (os, arch) = target.platform()?;
        Ok(Self {
            id: id.to_string(),
            version: version.to_string(),
            os: os.to_string(),
            arch: arch.to_string(),
            download: DOWNLOAD_KIND,
        })
    }

    /// JSON text of the `info` part
    pub fn to_json(&self) -> Result<String, UploadError> {
        Ok(serde_json::to_string(self)?)
    }
}
