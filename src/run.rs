//! Orchestrates the end-to-end symbol upload.
//!
//! The workflow resolves the project for the API key, packages the bundles
//! found under the search path, registers a size-declared upload record,
//! transfers the archive bytes, and optionally polls the metadata service
//! until processing reaches a terminal state. Every step is driven through
//! the [`CrashApi`] trait so the whole run can be scripted in tests.

use std::time::Duration;

use camino::Utf8Path;
use thiserror::Error;
use tokio::time::sleep;

use crate::api::{CrashApi, ProjectId, UploadId, UploadStatus};
use crate::archive::{ArchiveBuilder, ArchiveError, SymbolArchive};

/// Interval between status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default poll budget.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(600);

/// Errors surfaced while performing an upload run.
#[derive(Debug, Error)]
pub enum RunError<ApiError>
where
    ApiError: std::error::Error + 'static,
{
    /// Raised when locating or packaging symbol bundles fails.
    #[error("failed to archive symbols: {0}")]
    Archive(#[source] ArchiveError),
    /// Raised when the project lookup fails.
    #[error("failed to look up project: {0}")]
    Lookup(#[source] ApiError),
    /// Raised when the upload record cannot be created.
    #[error("failed to create upload: {0}")]
    CreateUpload(#[source] ApiError),
    /// Raised when the archive bytes cannot be transferred.
    #[error("failed to send archive: {0}")]
    Transfer(#[source] ApiError),
    /// Raised when a status poll fails.
    #[error("failed to check upload status: {0}")]
    Status(#[source] ApiError),
    /// Raised when the server reports that processing failed.
    #[error(
        "Upload was not processed. If this issue persists please contact Flurry Support\nError: {reason}"
    )]
    ProcessingFailed {
        /// Failure reason reported by the server.
        reason: String,
    },
    /// Raised when the poll budget runs out before a terminal state.
    #[error(
        "Upload was not processed. If this issue persists please contact Flurry Support\nError: Timed out waiting for upload to be processed."
    )]
    ProcessingTimedOut,
}

/// Summary of a completed run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunOutcome {
    /// Project the symbols were uploaded to.
    pub project: ProjectId,
    /// Upload record created for the archive.
    pub upload: UploadId,
    /// The archive that was transferred. The file is left in place.
    pub archive: SymbolArchive,
    /// Whether server-side processing was confirmed. `false` in
    /// `--no-wait` mode, where the run ends right after the transfer.
    pub processed: bool,
}

/// Executes the upload flow using the provided API client and archiver.
#[derive(Debug)]
pub struct UploadOrchestrator<A: CrashApi> {
    api: A,
    archiver: ArchiveBuilder,
    poll_interval: Duration,
    max_wait: Duration,
    wait: bool,
}

impl<A> UploadOrchestrator<A>
where
    A: CrashApi,
{
    /// Creates a new orchestrator with the default poll cadence.
    #[must_use]
    pub const fn new(api: A, archiver: ArchiveBuilder) -> Self {
        Self {
            api,
            archiver,
            poll_interval: POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            wait: true,
        }
    }

    /// Overrides the polling interval.
    ///
    /// This is primarily used by tests to keep timing scenarios fast.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the poll budget.
    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Enables or disables waiting for server-side processing.
    #[must_use]
    pub const fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// Runs the pipeline: lookup, archive, create, transfer, poll.
    ///
    /// The project lookup happens before any filesystem work so an invalid
    /// API key fails the run without leaving an archive behind.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when any step fails or processing does not
    /// complete within the poll budget.
    pub async fn execute(
        &self,
        api_key: &str,
        search_path: &Utf8Path,
    ) -> Result<RunOutcome, RunError<A::Error>> {
        tracing::info!("fetching project");
        let project = self
            .api
            .lookup_project(api_key)
            .await
            .map_err(RunError::Lookup)?;

        tracing::info!("archiving symbol bundles");
        let archive = self.archiver.build(search_path).map_err(RunError::Archive)?;
        tracing::info!(path = %archive.path, size = archive.size_bytes, "created archive");

        tracing::info!("creating upload");
        let upload = self
            .api
            .create_upload(project, archive.size_bytes)
            .await
            .map_err(RunError::CreateUpload)?;

        tracing::info!("uploading file");
        self.api
            .send_archive(project, upload, &archive)
            .await
            .map_err(RunError::Transfer)?;

        if !self.wait {
            tracing::info!("skipping check to see if the symbols got processed");
            return Ok(RunOutcome {
                project,
                upload,
                archive,
                processed: false,
            });
        }

        self.wait_for_processing(project, upload).await?;
        Ok(RunOutcome {
            project,
            upload,
            archive,
            processed: true,
        })
    }

    /// Polls the upload state until it turns terminal or the budget runs
    /// out. The budget is `floor(max_wait / poll_interval)` queries.
    async fn wait_for_processing(
        &self,
        project: ProjectId,
        upload: UploadId,
    ) -> Result<(), RunError<A::Error>> {
        let budget = self
            .max_wait
            .as_millis()
            .div_euclid(self.poll_interval.as_millis().max(1));

        for attempt in 1..=budget {
            let state = self
                .api
                .fetch_upload_state(project, upload)
                .await
                .map_err(RunError::Status)?;

            match state.status {
                UploadStatus::Completed => {
                    let suffix = state
                        .failure_reason
                        .map_or_else(String::new, |reason| format!(" ({reason})"));
                    tracing::info!("Successfully uploaded and processed dSYM files{suffix}");
                    return Ok(());
                }
                UploadStatus::Failed => {
                    return Err(RunError::ProcessingFailed {
                        reason: state.failure_reason.unwrap_or_default(),
                    });
                }
                ref status => {
                    tracing::info!(status = status.progress_label(), "upload status");
                }
            }

            if attempt < budget {
                sleep(self.poll_interval).await;
            }
        }

        Err(RunError::ProcessingTimedOut)
    }
}
