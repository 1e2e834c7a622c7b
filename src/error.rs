//! Error types for lessonforge operations.
//!
//! Defines error types for the major subsystems:
//! - Grouping preconditions and persistence
//! - Generation backend calls
//! - Variant pipelines and aggregation
//! - Feedback normalization and scoring

use thiserror::Error;
use uuid::Uuid;

use crate::storage::StoreError;

/// Errors that can occur while creating groups for a task.
#[derive(Debug, Error)]
pub enum GroupingError {
    #[error("Task '{0}' not found")]
    TaskNotFound(Uuid),

    #[error("Class '{0}' not found")]
    ClassNotFound(Uuid),

    #[error("Task '{0}' is a variant; groups are created for parent tasks only")]
    NotAParentTask(Uuid),

    #[error("Failed to persist group {group_number}: {source}")]
    GroupPersistFailed {
        group_number: u32,
        #[source]
        source: StoreError,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by generation backend calls.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Missing API key: BACKBOARD_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Missing API base URL: BACKBOARD_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse backend response: {0}")]
    ParseError(String),

    #[error("Backend returned an empty response")]
    EmptyResponse,

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Generation call timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while running or aggregating variants.
#[derive(Debug, Error)]
pub enum VariantError {
    #[error("Task '{0}' not found")]
    TaskNotFound(Uuid),

    #[error("Task '{0}' is not a parent task")]
    NotAParentTask(Uuid),

    #[error("Combo '{name}' is not in the catalogue for {kind} tasks")]
    UnknownCombo { name: String, kind: String },

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors that can occur in the feedback path. These never fail the
/// session-completion request; callers log and continue.
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Vitals probe failed: {0}")]
    ProbeFailed(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
