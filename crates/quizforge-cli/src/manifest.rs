//! The question list of the saved test.
//!
//! Saved progress holds answers but not the randomly drawn questions, so the
//! CLI records which questions it drew, in order, next to the store.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const MANIFEST_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionManifest {
    pub test_id: String,
    pub category_id: String,
    pub question_ids: Vec<String>,
}

fn path(data_dir: &Path) -> PathBuf {
    data_dir.join(MANIFEST_FILE)
}

pub fn save(data_dir: &Path, manifest: &SessionManifest) -> Result<()> {
    let path = path(data_dir);
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// `None` when there is no manifest or it cannot be read.
pub fn load(data_dir: &Path) -> Option<SessionManifest> {
    let path = path(data_dir);
    let content = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            tracing::warn!("ignoring corrupt {}: {e}", path.display());
            None
        }
    }
}

pub fn remove(data_dir: &Path) {
    let path = path(data_dir);
    if let Err(e) = std::fs::remove_file(&path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("failed to remove {}: {e}", path.display());
        }
    }
}
