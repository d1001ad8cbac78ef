//! Client for the Pulse crash symbolication services.
//!
//! Two endpoints are involved: the metadata service tracks projects and
//! upload records (JSON:API), and the upload service accepts the raw archive
//! bytes. Every request funnels through one execution path that applies the
//! transport retry policy and maps failures uniformly.

mod error;
mod types;

use std::time::Duration;

use reqwest::header;

use crate::api::{ApiFuture, CrashApi, ProjectId, UploadId, UploadState, UploadStatus};
use crate::archive::SymbolArchive;
use types::{CreateUploadDocument, IdentifierDocument, IdentifierList, StatusDocument};

pub use error::PulseClientError;

/// Default base URL of the metadata service.
pub const METADATA_BASE: &str = "https://crash-metadata.flurry.com/pulse/v1";
/// Default base URL of the binary upload service.
pub const UPLOAD_BASE: &str = "https://upload.flurry.com/upload/v1";

const JSON_API_MIME: &str = "application/vnd.api+json";
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

/// Retry policy applied to transport-level failures.
///
/// Only requests that never produced an HTTP response are retried; protocol
/// errors and the upload endpoint's status check are not.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts per request, first try included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

/// Client for the metadata and upload services.
#[derive(Clone, Debug)]
pub struct PulseClient {
    http: reqwest::Client,
    token: String,
    metadata_base: String,
    upload_base: String,
    retry: RetryPolicy,
    transfer_timeout: Duration,
}

impl PulseClient {
    /// Constructs a client authenticating with the given token.
    ///
    /// `insecure` disables TLS certificate verification for the whole run.
    ///
    /// # Errors
    ///
    /// Returns [`PulseClientError::Init`] when the HTTP client cannot be
    /// constructed.
    pub fn new(token: impl Into<String>, insecure: bool) -> Result<Self, PulseClientError> {
        let http = reqwest::Client::builder()
            .timeout(METADATA_TIMEOUT)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|err| PulseClientError::Init(err.to_string()))?;
        Ok(Self {
            http,
            token: token.into(),
            metadata_base: String::from(METADATA_BASE),
            upload_base: String::from(UPLOAD_BASE),
            retry: RetryPolicy::default(),
            transfer_timeout: TRANSFER_TIMEOUT,
        })
    }

    /// Overrides both service base URLs; trailing slashes are trimmed.
    #[must_use]
    pub fn with_base_urls(
        mut self,
        metadata_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        self.metadata_base = trim_base(metadata_base.into());
        self.upload_base = trim_base(upload_base.into());
        self
    }

    /// Overrides the transport retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the binary transfer timeout.
    #[must_use]
    pub const fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Applies bearer authentication and the JSON:API media type.
    fn json_api(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header(header::ACCEPT, JSON_API_MIME)
            .header(header::CONTENT_TYPE, JSON_API_MIME)
    }

    /// Sends the request, retrying transport-level failures per the policy.
    ///
    /// The builder is cloned per attempt; bodies are always buffered, so the
    /// clone cannot fail in practice.
    async fn execute(
        &self,
        task: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PulseClientError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_error: Option<reqwest::Error> = None;
        for attempt in 1..=attempts {
            let Some(builder) = request.try_clone() else {
                break;
            };
            match builder.send().await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    tracing::debug!(task, attempt, error = %err, "transport failure");
                    last_error = Some(err);
                }
            }
        }
        Err(PulseClientError::Transport {
            task: String::from(task),
            message: last_error.map_or_else(
                || String::from("request body cannot be replayed"),
                |err| err.to_string(),
            ),
        })
    }

    /// Maps a non-success response to a protocol error carrying the body.
    async fn checked(
        task: &'static str,
        method: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PulseClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = if status == reqwest::StatusCode::UNAUTHORIZED {
            String::from("UNAUTHORIZED (Bad Token)")
        } else {
            response.text().await.unwrap_or_default()
        };
        Err(PulseClientError::Protocol {
            task: String::from(task),
            method: String::from(method),
            url,
            status: status.as_u16(),
            body,
        })
    }

    fn invalid_response(task: &'static str, message: impl Into<String>) -> PulseClientError {
        PulseClientError::InvalidResponse {
            task: String::from(task),
            message: message.into(),
        }
    }

    /// Resolves an API key to the owning project's identifier.
    async fn lookup(&self, api_key: &str) -> Result<ProjectId, PulseClientError> {
        let task = "looking up project";
        let url = format!("{}/project", self.metadata_base);
        let request = self.json_api(self.http.get(&url)).query(&[
            ("filter[project.apiKey]", api_key),
            ("fields[project]", "apiKey"),
        ]);
        let response = self.execute(task, request).await?;
        let ok = Self::checked(task, "GET", response).await?;
        let document: IdentifierList = ok
            .json()
            .await
            .map_err(|err| Self::invalid_response(task, err.to_string()))?;
        let Some(first) = document.data.first() else {
            return Err(PulseClientError::InvalidApiKey);
        };
        let id = first
            .as_u64()
            .ok_or_else(|| Self::invalid_response(task, "project id is not numeric"))?;
        tracing::debug!(project = id, "resolved project");
        Ok(ProjectId::new(id))
    }

    /// Registers a size-declared upload and returns its identifier.
    async fn create(
        &self,
        project: ProjectId,
        content_length: u64,
    ) -> Result<UploadId, PulseClientError> {
        let task = "creating upload";
        let url = format!("{}/project/{project}/uploads", self.metadata_base);
        let body = CreateUploadDocument::ios(project, content_length);
        let request = self.json_api(self.http.post(&url).json(&body));
        let response = self.execute(task, request).await?;
        let ok = Self::checked(task, "POST", response).await?;
        let document: IdentifierDocument = ok
            .json()
            .await
            .map_err(|err| Self::invalid_response(task, err.to_string()))?;
        let id = document
            .data
            .as_u64()
            .ok_or_else(|| Self::invalid_response(task, "upload id is not numeric"))?;
        tracing::debug!(upload = id, "created upload");
        Ok(UploadId::new(id))
    }

    /// Transfers the archive bytes, expecting HTTP 201 or 202.
    async fn send(
        &self,
        project: ProjectId,
        upload: UploadId,
        archive: &SymbolArchive,
    ) -> Result<(), PulseClientError> {
        let task = "uploading file";
        let url = format!("{}/upload/{project}/{upload}", self.upload_base);
        let bytes = tokio::fs::read(archive.path.as_std_path())
            .await
            .map_err(|err| PulseClientError::ArchiveRead {
                path: archive.path.clone(),
                message: err.to_string(),
            })?;
        let range_end = archive.size_bytes.saturating_sub(1);
        let request = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::RANGE, format!("bytes 0-{range_end}"))
            .header(header::CONTENT_LENGTH, archive.size_bytes)
            .timeout(self.transfer_timeout)
            .body(bytes);
        let response = self.execute(task, request).await?;
        match response.status().as_u16() {
            201 | 202 => Ok(()),
            status => Err(PulseClientError::UploadRejected { status }),
        }
    }

    /// Fetches the current processing state of an upload record.
    async fn status(
        &self,
        project: ProjectId,
        upload: UploadId,
    ) -> Result<UploadState, PulseClientError> {
        let task = "checking upload status";
        let url = format!("{}/project/{project}/uploads/{upload}", self.metadata_base);
        let request = self
            .json_api(self.http.get(&url))
            .query(&[("fields[upload]", "uploadStatus,failureReason")]);
        let response = self.execute(task, request).await?;
        let ok = Self::checked(task, "GET", response).await?;
        let document: StatusDocument = ok
            .json()
            .await
            .map_err(|err| Self::invalid_response(task, err.to_string()))?;
        let attributes = document.data.attributes;
        Ok(UploadState {
            status: UploadStatus::parse(&attributes.upload_status),
            failure_reason: attributes.failure_reason.filter(|reason| !reason.is_empty()),
        })
    }
}

impl CrashApi for PulseClient {
    type Error = PulseClientError;

    fn lookup_project<'a>(&'a self, api_key: &'a str) -> ApiFuture<'a, ProjectId, Self::Error> {
        Box::pin(async move { self.lookup(api_key).await })
    }

    fn create_upload<'a>(
        &'a self,
        project: ProjectId,
        content_length: u64,
    ) -> ApiFuture<'a, UploadId, Self::Error> {
        Box::pin(async move { self.create(project, content_length).await })
    }

    fn send_archive<'a>(
        &'a self,
        project: ProjectId,
        upload: UploadId,
        archive: &'a SymbolArchive,
    ) -> ApiFuture<'a, (), Self::Error> {
        Box::pin(async move { self.send(project, upload, archive).await })
    }

    fn fetch_upload_state<'a>(
        &'a self,
        project: ProjectId,
        upload: UploadId,
    ) -> ApiFuture<'a, UploadState, Self::Error> {
        Box::pin(async move { self.status(project, upload).await })
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_owned()
}
