//! [`QuestionProvider`] implementations.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::error::LoadError;
use crate::parser::{bank_files, parse_bank_str};
use crate::traits::{QuestionCategory, QuestionProvider};

/// Serves categories held in memory.
pub struct StaticProvider {
    categories: BTreeMap<String, QuestionCategory>,
}

impl StaticProvider {
    pub fn new(categories: Vec<QuestionCategory>) -> Self {
        Self {
            categories: categories.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }
}

#[async_trait]
impl QuestionProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn category_ids(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    async fn load_category(&self, category_id: &str) -> Result<QuestionCategory, LoadError> {
        self.categories
            .get(category_id)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(category_id.to_string()))
    }
}

/// Only the header, to index files without parsing every question.
#[derive(Deserialize)]
struct HeaderOnly {
    category: HeaderId,
}

#[derive(Deserialize)]
struct HeaderId {
    id: String,
}

/// Serves the TOML banks found under a directory.
///
/// Files are indexed by their `[category] id` when it can be read, and by
/// file stem otherwise, so a broken file still shows up as a failing
/// category instead of vanishing. Files are re-read on every load.
pub struct DirectoryProvider {
    root: PathBuf,
    index: BTreeMap<String, PathBuf>,
}

impl DirectoryProvider {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            anyhow::bail!("question bank directory not found: {}", root.display());
        }

        let mut index = BTreeMap::new();
        for path in bank_files(&root)? {
            let id = std::fs::read_to_string(&path)
                .ok()
                .and_then(|content| toml::from_str::<HeaderOnly>(&content).ok())
                .map(|h| h.category.id)
                .or_else(|| {
                    path.file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                })
                .unwrap_or_default();

            if let Some(previous) = index.insert(id.clone(), path.clone()) {
                tracing::warn!(
                    category = %id,
                    "{} shadows {}",
                    path.display(),
                    previous.display()
                );
            }
        }

        tracing::debug!(root = %root.display(), categories = index.len(), "indexed question banks");
        Ok(Self { root, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, category_id: &str) -> Option<&Path> {
        self.index.get(category_id).map(PathBuf::as_path)
    }
}

#[async_trait]
impl QuestionProvider for DirectoryProvider {
    fn name(&self) -> &str {
        "directory"
    }

    fn category_ids(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    async fn load_category(&self, category_id: &str) -> Result<QuestionCategory, LoadError> {
        let path = self
            .index
            .get(category_id)
            .ok_or_else(|| LoadError::NotFound(category_id.to_string()))?;

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LoadError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        parse_bank_str(&content, path).map_err(|e| LoadError::Invalid {
            source_name: path.display().to_string(),
            message: format!("{e:#}"),
        })
    }
}
