//! Multipart upload client.

use super::{
    DEFAULT_REGISTRY_URL, DEFAULT_USER_AGENT, RegistryResponse, UPLOAD_FILE_NAME, UploadDescriptor,
    UploadResult,
};
use crate::error::{ConfigError, ReleaseError, UploadError};
use crate::package::PackageArchive;
use reqwest::header::USER_AGENT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use std::time::Duration;

/// Connection settings for the registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Full upload endpoint URL
    pub endpoint: String,
    /// User agent header value
    pub user_agent: String,
    /// File name announced for the `files` part.
    ///
    /// The registry identifies the target from `info`, so this stays the same
    /// for every archive of a run.
    pub upload_file_name: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_REGISTRY_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            upload_file_name: UPLOAD_FILE_NAME.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Sends archives to the registry upload endpoint.
#[derive(Debug, Clone)]
pub struct RegistryUploader {
    client: Client,
    endpoint: Url,
    user_agent: String,
    upload_file_name: String,
}

impl RegistryUploader {
    /// Build a client for `config`.
    pub fn new(config: &RegistryConfig) -> Result<Self, ReleaseError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| ConfigError::InvalidRegistryUrl {
            url: config.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidRegistryUrl {
                url: config.endpoint.clone(),
                reason: format!("unsupported scheme '{}'", endpoint.scheme()),
            }
            .into());
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UploadError::Request {
                reason: format!("HTTP client setup failed: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint,
            user_agent: config.user_agent.clone(),
            upload_file_name: config.upload_file_name.clone(),
        })
    }

    /// Upload `archive` and classify the response.
    pub async fn upload(
        &self,
        archive: &PackageArchive,
        descriptor: &UploadDescriptor,
        token: &str,
    ) -> Result<UploadResult, UploadError> {
        self.send(archive, descriptor, token).await?.into_result()
    }

    /// Send one upload request.
    ///
    /// Errors are returned only when no request could be made; everything the
    /// registry or the network answers comes back as a [`RegistryResponse`].
    pub async fn send(
        &self,
        archive: &PackageArchive,
        descriptor: &UploadDescriptor,
        token: &str,
    ) -> Result<RegistryResponse, UploadError> {
        let form = self.form(archive, descriptor).await?;

        log::info!(
            "Uploading {} to {} ({}-{})",
            archive.archive_path.display(),
            self.endpoint,
            descriptor.os,
            descriptor.arch
        );

        let response = match self
            .client
            .post(self.endpoint.clone())
            .header("token", token)
            .header(USER_AGENT, &self.user_agent)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return Err(UploadError::Request {
                    reason: e.to_string(),
                });
            }
            Err(e) => return Ok(RegistryResponse::NetworkError(e.to_string())),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(RegistryResponse::NetworkError(format!(
                    "failed to read response body (HTTP {}): {}",
                    status, e
                )));
            }
        };
        log::debug!("Registry answered HTTP {}: {}", status, body);

        Ok(RegistryResponse::from_status(status, body))
    }

    async fn form(
        &self,
        archive: &PackageArchive,
        descriptor: &UploadDescriptor,
    ) -> Result<Form, UploadError> {
        let bytes = tokio::fs::read(&archive.archive_path)
            .await
            .map_err(|source| UploadError::ReadArchive {
                path: archive.archive_path.clone(),
                source,
            })?;

        let mime_err = |e: reqwest::Error| UploadError::Request {
            reason: e.to_string(),
        };
        let info = Part::text(descriptor.to_json()?)
            .file_name("json_data")
            .mime_str("application/json")
            .map_err(mime_err)?;
        let files = Part::bytes(bytes)
            .file_name(self.upload_file_name.clone())
            .mime_str("application/octet-stream")
            .map_err(mime_err)?;

        Ok(Form::new().part("info", info).part("files", files))
    }
}
