//! Error types for sessions, storage and question loading.
//!
//! Every [`QuizError`] carries a stable discriminating code so that callers
//! (the CLI, the edge router, a UI) can branch on the kind of failure
//! without string matching.

use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the session state machine, the answer persistence
/// facade and random session assembly.
#[derive(Debug, Error)]
pub enum QuizError {
    /// A session operation was invoked before `initialize_test`/`resume_test`.
    #[error("test session is not initialized")]
    NotInitialized,

    /// A navigation target was outside the question list.
    #[error("question index {index} is out of range (0..{len})")]
    InvalidIndex { index: usize, len: usize },

    /// Resume was attempted with nothing to resume.
    #[error("no saved progress to resume")]
    NoSavedProgress,

    /// A persistence operation found no progress record.
    #[error("no active test")]
    NoActiveTest,

    /// The requested question category does not exist, or its bank could not
    /// be loaded; `cause` holds the load failure in the latter case.
    #[error("category not found: {id}{}", cause_suffix(.cause))]
    CategoryNotFound { id: String, cause: Option<String> },

    /// The category pool is smaller than the requested session.
    #[error("category '{category}' has {available} questions, {requested} requested")]
    InsufficientQuestions {
        category: String,
        requested: usize,
        available: usize,
    },

    /// The storage backend failed on a write path.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            QuizError::NotInitialized => "NOT_INITIALIZED",
            QuizError::InvalidIndex { .. } => "INVALID_INDEX",
            QuizError::NoSavedProgress => "NO_SAVED_PROGRESS",
            QuizError::NoActiveTest => "NO_ACTIVE_TEST",
            QuizError::CategoryNotFound { .. } => "CATEGORY_NOT_FOUND",
            QuizError::InsufficientQuestions { .. } => "INSUFFICIENT_QUESTIONS",
            QuizError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Optional structured payload describing the failure.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            QuizError::InvalidIndex { index, len } => Some(json!({ "index": index, "len": len })),
            QuizError::CategoryNotFound { id, cause: None } => Some(json!({ "categoryId": id })),
            QuizError::CategoryNotFound {
                id,
                cause: Some(cause),
            } => Some(json!({ "categoryId": id, "cause": cause })),
            QuizError::InsufficientQuestions {
                category,
                requested,
                available,
            } => Some(json!({
                "categoryId": category,
                "requested": requested,
                "available": available,
            })),
            QuizError::Storage(e) => Some(json!({ "cause": e.to_string() })),
            _ => None,
        }
    }

    /// Returns `true` for errors that indicate a bug in the caller rather
    /// than a runtime condition.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            QuizError::NotInitialized | QuizError::InvalidIndex { .. }
        )
    }
}

/// Errors from the key-value storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store is full.
    #[error("storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

fn cause_suffix(cause: &Option<String>) -> String {
    cause
        .as_ref()
        .map(|c| format!(" (could not be loaded: {c})"))
        .unwrap_or_default()
}

/// Failure to load one question category.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("failed to read question bank {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid question bank {source_name}: {message}")]
    Invalid {
        source_name: String,
        message: String,
    },

    #[error("category not found: {0}")]
    NotFound(String),
}
