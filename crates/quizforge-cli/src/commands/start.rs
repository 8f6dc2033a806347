//! The `quizforge start` command.

use anyhow::{Context, Result};

use quizforge_core::assembly::assemble_session;
use quizforge_core::bank::DirectoryProvider;
use quizforge_core::error::QuizError;
use quizforge_core::model::TestMode;
use quizforge_core::session::TestSession;
use quizforge_store::{create_store, QuizforgeConfig};

use crate::interactive::{self, ConsoleObserver};
use crate::manifest::{self, SessionManifest};

pub async fn execute(
    config: &QuizforgeConfig,
    category: String,
    count: Option<usize>,
    mode: String,
    time_limit: Option<u64>,
) -> Result<()> {
    let mode: TestMode = mode.parse().map_err(anyhow::Error::msg)?;
    let provider = DirectoryProvider::open(&config.bank_dir)?;

    let requested = count.unwrap_or(config.default_question_count);
    let assembled = match assemble_session(&provider, &category, requested).await {
        Ok(assembled) => assembled,
        // Without an explicit count, a small bank is used whole.
        Err(QuizError::InsufficientQuestions { available, .. }) if count.is_none() => {
            tracing::info!(requested, available, "category is smaller than the default count");
            assemble_session(&provider, &category, available).await?
        }
        Err(e) => return Err(e.into()),
    };
    if assembled.questions.is_empty() {
        anyhow::bail!("category '{category}' has no questions");
    }

    let time_limit = match mode {
        TestMode::Test => time_limit.or(config.default_time_limit_secs),
        TestMode::Practice => None,
    };

    let store = create_store(config)?;
    let show_explanations = store.get_preferences().show_explanations;
    if store.get_progress().is_some_and(|p| !p.is_completed) {
        println!("Discarding the previously saved test.");
    }

    let (observer, done) = ConsoleObserver::new();
    let session = TestSession::with_observer(store, observer);
    session.initialize_test(&assembled.test_type, mode, assembled.questions.clone(), time_limit);

    let state = session.state().context("session did not initialize")?;
    manifest::save(
        &config.data_dir,
        &SessionManifest {
            test_id: state.test_id.clone(),
            category_id: assembled.category_id.clone(),
            question_ids: assembled.questions.iter().map(|q| q.id.clone()).collect(),
        },
    )?;

    println!(
        "{} ({} of {} questions, {} mode{})",
        assembled.category_name,
        assembled.questions.len(),
        assembled.total_in_pool,
        mode,
        time_limit
            .map(|secs| format!(", {} limit", interactive::format_duration(secs)))
            .unwrap_or_default()
    );

    if let Some(results) = interactive::run(&session, done, show_explanations).await? {
        manifest::remove(&config.data_dir);
        interactive::print_results(&results);
    }
    Ok(())
}
