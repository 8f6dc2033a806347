//! Key-value backends.
//!
//! A backend stores opaque string values under string keys and may refuse a
//! write with [`StorageError::QuotaExceeded`], the way browser local storage
//! does when it is full.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use quizforge_core::error::StorageError;

/// A string key-value store.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Fails with [`StorageError::QuotaExceeded`] when the value does not fit.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Keeps values in a map, with an optional quota on total key + value bytes.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently used, counting keys and values.
    pub fn used_bytes(&self) -> usize {
        self.entries()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries();
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded { key: key.into() });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temporary file that is renamed into place, so a crash never
/// leaves a half-written value behind.
pub struct FileBackend {
    dir: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileBackend {
    /// Open (creating if needed) the storage directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            quota_bytes: None,
        })
    }

    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::Backend(format!("invalid storage key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Size of every stored value except `key`'s.
    fn used_bytes_excluding(&self, key_path: &Path) -> Result<u64, StorageError> {
        let mut total = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path == key_path || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            total += entry.metadata()?.len();
        }
        Ok(total)
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(quota) = self.quota_bytes {
            if self.used_bytes_excluding(&path)? + value.len() as u64 > quota {
                return Err(StorageError::QuotaExceeded { key: key.into() });
            }
        }

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| full_or_io(key, e))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| full_or_io(key, e))?;
        tmp.persist(&path).map_err(|e| full_or_io(key, e.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn full_or_io(key: &str, e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::StorageFull {
        StorageError::QuotaExceeded { key: key.into() }
    } else {
        StorageError::Io(e)
    }
}
