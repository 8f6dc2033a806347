//! The `quizforge serve` command.

use anyhow::Result;
use quizforge_store::QuizforgeConfig;

pub async fn execute(config: &QuizforgeConfig, addr: Option<String>) -> Result<()> {
    let addr = addr.unwrap_or_else(|| config.bind_addr.clone());
    quizforge_edge::serve(&addr).await
}
