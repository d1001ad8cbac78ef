//! Error types for the Pulse service client.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised by the Pulse metadata and upload clients.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum PulseClientError {
    /// Raised when the underlying HTTP client cannot be constructed.
    #[error("failed to initialise HTTP client: {0}")]
    Init(String),
    /// Raised when the API key matches no project.
    #[error("Invalid Api Key")]
    InvalidApiKey,
    /// Raised when a request fails at the transport level after the retry
    /// budget is exhausted (connection reset, DNS failure, timeout).
    #[error("error {task}. {message}")]
    Transport {
        /// Task the request was performing.
        task: String,
        /// Underlying transport error message.
        message: String,
    },
    /// Raised when the service answers with a non-success status.
    #[error("error {task}. ({method} {url} => {status}) {body}")]
    Protocol {
        /// Task the request was performing.
        task: String,
        /// HTTP method of the failed request.
        method: String,
        /// URL of the failed request.
        url: String,
        /// HTTP status code returned by the service.
        status: u16,
        /// Response body, replaced with a friendly hint on 401.
        body: String,
    },
    /// Raised when the binary upload endpoint answers with anything other
    /// than 201 or 202. Never retried.
    #[error("failed to send file to upload service (HTTP {status})")]
    UploadRejected {
        /// Unexpected HTTP status code.
        status: u16,
    },
    /// Raised when a response does not match the expected JSON:API shape.
    #[error("unexpected response while {task}: {message}")]
    InvalidResponse {
        /// Task the request was performing.
        task: String,
        /// Description of the shape mismatch.
        message: String,
    },
    /// Raised when the archive file cannot be read for transfer.
    #[error("failed to read archive {path}: {message}")]
    ArchiveRead {
        /// Archive path that could not be read.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}
