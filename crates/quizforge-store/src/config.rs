//! Configuration loading and store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizforge_core::traits::ProgressStore;

use crate::backend::FileBackend;
use crate::local::LocalStore;

/// Top-level quizforge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizforgeConfig {
    /// Directory holding progress, history and preferences.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory of TOML question banks.
    #[serde(default = "default_bank_dir")]
    pub bank_dir: PathBuf,
    /// Refuse writes once stored values exceed this many bytes.
    #[serde(default)]
    pub storage_quota_bytes: Option<u64>,
    /// Time limit for test mode when none is given on the command line.
    #[serde(default)]
    pub default_time_limit_secs: Option<u64>,
    /// Questions drawn per session.
    #[serde(default = "default_question_count")]
    pub default_question_count: usize,
    /// Address for `quizforge serve`.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Default tracing filter directive.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./.quizforge")
}
fn default_bank_dir() -> PathBuf {
    PathBuf::from("./question-banks")
}
fn default_question_count() -> usize {
    10
}
fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}
fn default_log_filter() -> String {
    "quizforge=info".to_string()
}

impl Default for QuizforgeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bank_dir: default_bank_dir(),
            storage_quota_bytes: None,
            default_time_limit_secs: None,
            default_question_count: default_question_count(),
            bind_addr: default_bind_addr(),
            log_filter: default_log_filter(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_path(p: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&p.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizforge.toml` in the current directory
/// 2. `~/.config/quizforge/config.toml`
///
/// Environment variable overrides: `QUIZFORGE_DATA_DIR`, `QUIZFORGE_BANK_DIR`,
/// `QUIZFORGE_BIND_ADDR`.
pub fn load_config() -> Result<QuizforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizforgeConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("quizforge.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<QuizforgeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => QuizforgeConfig::default(),
    };

    apply_env_overrides(&mut config);

    config.data_dir = resolve_path(&config.data_dir);
    config.bank_dir = resolve_path(&config.bank_dir);
    config.bind_addr = resolve_env_vars(&config.bind_addr);
    config.log_filter = resolve_env_vars(&config.log_filter);

    Ok(config)
}

fn apply_env_overrides(config: &mut QuizforgeConfig) {
    if let Ok(dir) = std::env::var("QUIZFORGE_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("QUIZFORGE_BANK_DIR") {
        config.bank_dir = PathBuf::from(dir);
    }
    if let Ok(addr) = std::env::var("QUIZFORGE_BIND_ADDR") {
        config.bind_addr = addr;
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizforge"))
}

/// Open the file-backed store described by `config`.
pub fn create_store(config: &QuizforgeConfig) -> Result<Arc<dyn ProgressStore>> {
    let mut backend = FileBackend::open(&config.data_dir).with_context(|| {
        format!(
            "failed to open data directory: {}",
            config.data_dir.display()
        )
    })?;
    if let Some(quota) = config.storage_quota_bytes {
        backend = backend.with_quota(quota);
    }
    Ok(Arc::new(LocalStore::new(backend)))
}
