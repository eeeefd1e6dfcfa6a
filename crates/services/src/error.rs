//! Shared error types for the services crate.

use thiserror::Error;

use study_core::model::{
    QuizError, ScheduleError, ScheduleId, SessionError, SessionId,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Input failed validation; lists every missing or invalid field so the
/// caller can fix the request in one round trip.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("missing or invalid fields: {}", .fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<String>,
}

impl ValidationError {
    #[must_use]
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("study session {0} not found")]
    SessionNotFound(SessionId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Quiz(#[from] QuizError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ScheduleService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScheduleServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("schedule {0} not found")]
    ScheduleNotFound(ScheduleId),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the text-extraction collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExtractionError {
    #[error("text extraction failed: {0}")]
    Failed(String),
}

/// Errors emitted by the content-generation collaborator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("content generation is not configured")]
    Disabled,

    #[error("content generator returned an empty response")]
    EmptyResponse,

    #[error("content generator request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The generator answered, but the payload failed structural
    /// validation. `raw` carries the offending output truncated for
    /// diagnostics; it is never substituted with fabricated content.
    #[error("content generator returned malformed output: {reason}")]
    Malformed { reason: String, raw: String },
}

/// Errors emitted by `ContentService` workflows.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Schedule(#[from] ScheduleServiceError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
