//! quizforge-store: Durable storage for quizforge.
//!
//! Implements the `ProgressStore` contract from `quizforge-core` on top of
//! pluggable key-value backends, and loads the quizforge configuration that
//! decides where data lives.

pub mod backend;
pub mod config;
pub mod local;

pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use config::{create_store, load_config, load_config_from, QuizforgeConfig};
pub use local::LocalStore;
