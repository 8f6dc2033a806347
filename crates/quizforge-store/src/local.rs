//! [`ProgressStore`] over a key-value backend.

use serde::de::DeserializeOwned;
use serde::Serialize;

use quizforge_core::error::StorageError;
use quizforge_core::model::{PreferencesUpdate, TestResults, UserPreferences, UserProgress};
use quizforge_core::traits::{ProgressStore, HISTORY_LIMIT};

use crate::backend::KeyValueBackend;

pub const PROGRESS_KEY: &str = "quizforge_progress";
pub const HISTORY_KEY: &str = "quizforge_history";
pub const PREFERENCES_KEY: &str = "quizforge_preferences";

/// Stores progress, history and preferences as JSON under fixed keys.
///
/// Unreadable or corrupt values are logged and read back as empty, so a bad
/// record never blocks starting a new test.
pub struct LocalStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> LocalStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, "failed to read stored value: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "discarding corrupt stored value: {e}");
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.backend.set(key, &json).inspect_err(|e| {
            if e.is_quota_exceeded() {
                tracing::error!(key, bytes = json.len(), "storage is full");
            }
        })
    }

    /// Remove progress, history and preferences.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        for key in [PROGRESS_KEY, HISTORY_KEY, PREFERENCES_KEY] {
            self.backend.remove(key)?;
        }
        Ok(())
    }
}

impl<B: KeyValueBackend> ProgressStore for LocalStore<B> {
    fn get_progress(&self) -> Option<UserProgress> {
        self.read(PROGRESS_KEY)
    }

    fn save_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        self.write(PROGRESS_KEY, progress)
    }

    fn clear_progress(&self) -> Result<(), StorageError> {
        self.backend.remove(PROGRESS_KEY)
    }

    fn get_history(&self) -> Vec<TestResults> {
        self.read(HISTORY_KEY).unwrap_or_default()
    }

    fn add_result(&self, result: &TestResults) -> Result<(), StorageError> {
        let mut history = self.get_history();
        history.insert(0, result.clone());
        history.truncate(HISTORY_LIMIT);
        self.write(HISTORY_KEY, &history)
    }

    fn get_preferences(&self) -> UserPreferences {
        self.read(PREFERENCES_KEY).unwrap_or_default()
    }

    fn save_preferences(&self, update: &PreferencesUpdate) -> Result<(), StorageError> {
        let mut preferences = self.get_preferences();
        preferences.merge(update);
        self.write(PREFERENCES_KEY, &preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FileBackend, MemoryBackend};
    use quizforge_core::model::TestMode;
    use std::collections::HashMap;

    fn progress() -> UserProgress {
        UserProgress {
            test_id: "physics_test_1".into(),
            test_type: "physics".into(),
            mode: TestMode::Test,
            start_time: 1_700_000_000_000,
            current_question_index: 3,
            answers: HashMap::new(),
            time_remaining: Some(120),
            is_completed: false,
        }
    }

    fn result(id: &str) -> TestResults {
        TestResults {
            test_id: id.into(),
            test_type: "physics".into(),
            mode: TestMode::Test,
            start_time: 0,
            end_time: 60_000,
            total_questions: 2,
            correct_answers: 1,
            incorrect_answers: 1,
            accuracy: 50.0,
            total_time_spent: 60,
            average_time_per_question: 30.0,
            answers: vec![],
            metadata: None,
        }
    }

    #[test]
    fn progress_uses_camel_case_json() {
        let store = LocalStore::new(MemoryBackend::new());
        store.save_progress(&progress()).unwrap();

        let raw = store.backend().get(PROGRESS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"testId\":\"physics_test_1\""));
        assert!(raw.contains("\"currentQuestionIndex\":3"));
        assert_eq!(store.get_progress().unwrap(), progress());

        store.clear_progress().unwrap();
        assert!(store.get_progress().is_none());
    }

    #[test]
    fn corrupt_values_read_as_empty() {
        let backend = MemoryBackend::new();
        backend.set(PROGRESS_KEY, "{not json").unwrap();
        backend.set(HISTORY_KEY, "42").unwrap();
        backend.set(PREFERENCES_KEY, "[]").unwrap();
        let store = LocalStore::new(backend);

        assert!(store.get_progress().is_none());
        assert!(store.get_history().is_empty());
        assert_eq!(store.get_preferences(), UserPreferences::default());

        // A corrupt history is replaced on the next append.
        store.add_result(&result("r1")).unwrap();
        assert_eq!(store.get_history().len(), 1);
    }

    #[test]
    fn history_is_newest_first_and_capped() {
        let store = LocalStore::new(MemoryBackend::new());
        for i in 0..(HISTORY_LIMIT + 3) {
            store.add_result(&result(&format!("r{i}"))).unwrap();
        }
        let history = store.get_history();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].test_id, format!("r{}", HISTORY_LIMIT + 2));
        assert_eq!(history.last().unwrap().test_id, "r3");
    }

    #[test]
    fn preferences_merge_shallowly() {
        let store = LocalStore::new(MemoryBackend::new());
        store
            .save_preferences(&PreferencesUpdate {
                theme: Some("dark".into()),
                ..Default::default()
            })
            .unwrap();
        store
            .save_preferences(&PreferencesUpdate {
                sound_enabled: Some(true),
                ..Default::default()
            })
            .unwrap();

        let prefs = store.get_preferences();
        assert_eq!(prefs.theme, "dark");
        assert!(prefs.sound_enabled);
        assert!(prefs.show_explanations);
    }

    #[test]
    fn quota_exceeded_surfaces_on_write() {
        let store = LocalStore::new(MemoryBackend::with_quota(64));
        let err = store.save_progress(&progress()).unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(store.get_progress().is_none());
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalStore::new(FileBackend::open(dir.path()).unwrap());
            store.save_progress(&progress()).unwrap();
            store.add_result(&result("r1")).unwrap();
        }
        let store = LocalStore::new(FileBackend::open(dir.path()).unwrap());
        assert_eq!(store.get_progress().unwrap().test_id, "physics_test_1");
        assert_eq!(store.get_history()[0].test_id, "r1");

        store.clear_all().unwrap();
        assert!(store.get_progress().is_none());
        assert!(store.get_history().is_empty());
    }
}
