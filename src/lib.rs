//! Core library for the `symsend` dSYM upload tool.
//!
//! The crate exposes the pieces of the upload pipeline: configuration
//! resolution, bundle discovery and archiving, the Pulse service client, and
//! the orchestrator driving lookup → archive → create → transfer → poll.

pub mod api;
pub mod archive;
pub mod config;
pub mod pulse;
pub mod run;

pub use api::{ApiFuture, CrashApi, ProjectId, UploadId, UploadState, UploadStatus};
pub use archive::{ArchiveBuilder, ArchiveError, SymbolArchive};
pub use config::{Config, ConfigError, ConfigSources};
pub use pulse::{PulseClient, PulseClientError, RetryPolicy};
pub use run::{RunError, RunOutcome, UploadOrchestrator};
