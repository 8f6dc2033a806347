//! In-process [`ProgressStore`] for tests and embedding.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::model::{PreferencesUpdate, TestResults, UserPreferences, UserProgress};
use crate::traits::{ProgressStore, HISTORY_LIMIT};

#[derive(Default)]
struct Slots {
    progress: Option<UserProgress>,
    history: Vec<TestResults>,
    preferences: UserPreferences,
}

/// A store that keeps everything in memory.
///
/// Writes can be made to fail with [`StorageError::QuotaExceeded`] via
/// [`MemoryStore::set_full`], which is how callers exercise their handling
/// of a full browser-style store.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<Slots>,
    full: AtomicBool,
    progress_saves: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_full(&self, full: bool) {
        self.full.store(full, Ordering::Relaxed);
    }

    /// Number of successful `save_progress` calls so far.
    pub fn progress_saves(&self) -> u32 {
        self.progress_saves.load(Ordering::Relaxed)
    }

    fn check_quota(&self, key: &str) -> Result<(), StorageError> {
        if self.full.load(Ordering::Relaxed) {
            return Err(StorageError::QuotaExceeded { key: key.into() });
        }
        Ok(())
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, Slots> {
        // A poisoned lock only means a panic elsewhere; the data is still usable.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProgressStore for MemoryStore {
    fn get_progress(&self) -> Option<UserProgress> {
        self.slots().progress.clone()
    }

    fn save_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        self.check_quota("progress")?;
        self.slots().progress = Some(progress.clone());
        self.progress_saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn clear_progress(&self) -> Result<(), StorageError> {
        self.slots().progress = None;
        Ok(())
    }

    fn get_history(&self) -> Vec<TestResults> {
        self.slots().history.clone()
    }

    fn add_result(&self, result: &TestResults) -> Result<(), StorageError> {
        self.check_quota("history")?;
        let mut slots = self.slots();
        slots.history.insert(0, result.clone());
        slots.history.truncate(HISTORY_LIMIT);
        Ok(())
    }

    fn get_preferences(&self) -> UserPreferences {
        self.slots().preferences.clone()
    }

    fn save_preferences(&self, update: &PreferencesUpdate) -> Result<(), StorageError> {
        self.check_quota("preferences")?;
        self.slots().preferences.merge(update);
        Ok(())
    }
}
