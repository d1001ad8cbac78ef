//! Abstraction over the crash symbolication service.
//!
//! The upload pipeline talks to two REST endpoints (metadata and binary
//! upload). This module defines the identifiers, upload states, and the
//! trait the orchestrator drives, so the whole run can be exercised against
//! scripted doubles in tests.

use std::future::Future;
use std::pin::Pin;

use crate::archive::SymbolArchive;

/// Identifier of a project tracked by the metadata service.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProjectId(u64);

impl ProjectId {
    /// Wraps a raw project identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ProjectId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an upload record created by the metadata service.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UploadId(u64);

impl UploadId {
    /// Wraps a raw upload identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for UploadId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-side processing state of an upload record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UploadStatus {
    /// The server is still receiving or assembling the archive bytes.
    Uploading,
    /// The archive arrived and is queued for symbol processing.
    Uploaded,
    /// Processing finished successfully; terminal.
    Completed,
    /// Processing failed; terminal.
    Failed,
    /// A status label this client does not know; polling continues.
    Other(String),
}

impl UploadStatus {
    /// Parses a status label case-insensitively; unknown labels are preserved
    /// verbatim in [`UploadStatus::Other`].
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "UPLOADING" => Self::Uploading,
            "UPLOADED" => Self::Uploaded,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            _ => Self::Other(label.to_owned()),
        }
    }

    /// Human-readable progress label shown while polling.
    #[must_use]
    pub const fn progress_label(&self) -> &'static str {
        match self {
            Self::Uploading => "Waiting",
            Self::Uploaded => "In Queue",
            _ => "Unknown",
        }
    }

    /// Whether this state ends the poll loop.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Snapshot of an upload record as reported by the metadata service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadState {
    /// Current processing status.
    pub status: UploadStatus,
    /// Failure reason, when the server supplied a non-empty one. The server
    /// only populates this on failure paths, but the field is passed through
    /// untouched either way.
    pub failure_reason: Option<String>,
}

/// Future returned by API operations.
pub type ApiFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface to the crash symbolication service.
///
/// One archive maps to one upload record: the orchestrator resolves the
/// project, registers a size-declared upload, transfers the archive bytes,
/// and polls the upload state until it turns terminal.
pub trait CrashApi {
    /// Service specific error type returned by the client.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resolves an API key to the owning project's identifier.
    fn lookup_project<'a>(&'a self, api_key: &'a str) -> ApiFuture<'a, ProjectId, Self::Error>;

    /// Registers an upload of `content_length` bytes for the project and
    /// returns the server-issued upload identifier.
    fn create_upload<'a>(
        &'a self,
        project: ProjectId,
        content_length: u64,
    ) -> ApiFuture<'a, UploadId, Self::Error>;

    /// Transfers the archive bytes to the binary upload endpoint.
    fn send_archive<'a>(
        &'a self,
        project: ProjectId,
        upload: UploadId,
        archive: &'a SymbolArchive,
    ) -> ApiFuture<'a, (), Self::Error>;

    /// Fetches the current processing state of an upload record.
    fn fetch_upload_state<'a>(
        &'a self,
        project: ProjectId,
        upload: UploadId,
    ) -> ApiFuture<'a, UploadState, Self::Error>;
}
