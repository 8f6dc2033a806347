//! Collaborator traits: durable storage and question sources.
//!
//! `quizforge-store` implements [`ProgressStore`] over key-value backends;
//! [`crate::bank`] implements [`QuestionProvider`] for TOML bank
//! directories and in-memory categories.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, StorageError};
use crate::model::{PreferencesUpdate, Question, TestResults, UserPreferences, UserProgress};

/// Maximum number of results kept in history.
pub const HISTORY_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// The durable store shared by the session state machine and the answer
/// persistence facade.
///
/// Read paths never fail: implementations log unreadable data and return
/// the empty or default value. Write paths surface [`StorageError`].
pub trait ProgressStore: Send + Sync {
    fn get_progress(&self) -> Option<UserProgress>;

    /// Fails with [`StorageError::QuotaExceeded`] when the store is full.
    fn save_progress(&self, progress: &UserProgress) -> Result<(), StorageError>;

    fn clear_progress(&self) -> Result<(), StorageError>;

    /// Most recent first.
    fn get_history(&self) -> Vec<TestResults>;

    /// Prepend `result`, keeping at most [`HISTORY_LIMIT`] entries.
    fn add_result(&self, result: &TestResults) -> Result<(), StorageError>;

    fn get_preferences(&self) -> UserPreferences;

    /// Shallow-merge `update` into the stored preferences.
    fn save_preferences(&self, update: &PreferencesUpdate) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// Question provider
// ---------------------------------------------------------------------------

/// A named pool of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Test type recorded on sessions built from this category.
    pub test_type: String,
    pub questions: Vec<Question>,
}

impl QuestionCategory {
    /// Number of questions available for random assembly.
    pub fn pool_size(&self) -> usize {
        self.questions.len()
    }
}

/// Source of question categories.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    /// Human-readable provider name (e.g. "directory").
    fn name(&self) -> &str;

    /// Identifiers of every category this provider can load.
    fn category_ids(&self) -> Vec<String>;

    /// Load one category. Fails with [`LoadError::NotFound`] for unknown ids.
    async fn load_category(&self, category_id: &str) -> Result<QuestionCategory, LoadError>;
}
