//! The `quizforge resume` command.

use std::collections::HashMap;

use anyhow::{bail, Result};

use quizforge_core::bank::DirectoryProvider;
use quizforge_core::error::QuizError;
use quizforge_core::model::Question;
use quizforge_core::session::TestSession;
use quizforge_core::traits::QuestionProvider;
use quizforge_store::{create_store, QuizforgeConfig};

use crate::interactive::{self, ConsoleObserver};
use crate::manifest;

pub async fn execute(config: &QuizforgeConfig, category: Option<String>) -> Result<()> {
    let store = create_store(config)?;
    let mut progress = store.get_progress().ok_or(QuizError::NoSavedProgress)?;
    if progress.is_completed {
        bail!("the saved test is already completed; start a new one");
    }

    let Some(saved) = manifest::load(&config.data_dir).filter(|m| m.test_id == progress.test_id)
    else {
        bail!(
            "saved test {} has no question list; start a new one",
            progress.test_id
        );
    };
    if let Some(expected) = category.filter(|c| *c != saved.category_id) {
        bail!(
            "the saved test is for category '{}', not '{expected}'",
            saved.category_id
        );
    }

    let provider = DirectoryProvider::open(&config.bank_dir)?;
    let bank = provider.load_category(&saved.category_id).await?;
    let (questions, index) = rebuild_questions(
        &saved.question_ids,
        bank.questions,
        progress.current_question_index,
    );
    if questions.is_empty() {
        bail!("none of the saved questions remain in '{}'", saved.category_id);
    }
    progress.current_question_index = index;

    let show_explanations = store.get_preferences().show_explanations;
    let answered = progress.answers.len();
    let (observer, done) = ConsoleObserver::new();
    let session = TestSession::with_observer(store, observer);
    session.resume_test(Some(progress))?;
    session.attach_questions(questions)?;

    if let Some(state) = session.state() {
        println!(
            "Resuming {} ({answered}/{} answered, {} mode{})",
            state.test_type,
            state.questions.len(),
            state.mode,
            state
                .time_remaining
                .map(|secs| format!(", {} left", interactive::format_duration(secs)))
                .unwrap_or_default()
        );
    }

    if let Some(results) = interactive::run(&session, done, show_explanations).await? {
        manifest::remove(&config.data_dir);
        interactive::print_results(&results);
    }
    Ok(())
}

/// Put the bank's questions back in the order they were drawn, dropping ids
/// no longer in the bank, and carry `saved_index` over to the same question.
///
/// When the current question itself is gone, the next surviving one is used.
fn rebuild_questions(
    question_ids: &[String],
    bank: Vec<Question>,
    saved_index: usize,
) -> (Vec<Question>, usize) {
    let mut by_id: HashMap<_, _> = bank.into_iter().map(|q| (q.id.clone(), q)).collect();
    let mut questions = Vec::with_capacity(question_ids.len());
    let mut index = None;
    for (i, id) in question_ids.iter().enumerate() {
        match by_id.remove(id) {
            Some(question) => {
                if i >= saved_index && index.is_none() {
                    index = Some(questions.len());
                }
                questions.push(question);
            }
            None => tracing::warn!(question = %id, "question no longer in bank, dropping"),
        }
    }
    let index = index.unwrap_or(questions.len().saturating_sub(1));
    (questions, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn bank(list: &[&str]) -> Vec<Question> {
        list.iter()
            .map(|id| Question::numeric(*id, "?", 1.0))
            .collect()
    }

    fn order(questions: &[Question]) -> Vec<&str> {
        questions.iter().map(|q| q.id.as_str()).collect()
    }

    #[test]
    fn keeps_draw_order() {
        let (questions, index) = rebuild_questions(&ids(&["c", "a", "b"]), bank(&["a", "b", "c"]), 1);
        assert_eq!(order(&questions), vec!["c", "a", "b"]);
        assert_eq!(index, 1);
    }

    #[test]
    fn index_follows_the_saved_question_past_a_dropped_one() {
        let (questions, index) = rebuild_questions(&ids(&["a", "b", "c"]), bank(&["a", "c"]), 2);
        assert_eq!(order(&questions), vec!["a", "c"]);
        assert_eq!(questions[index].id, "c");
    }

    #[test]
    fn dropped_current_question_moves_to_the_next_one() {
        let (questions, index) = rebuild_questions(&ids(&["a", "b", "c"]), bank(&["a", "c"]), 1);
        assert_eq!(questions[index].id, "c");

        let (questions, index) = rebuild_questions(&ids(&["a", "b"]), bank(&["a"]), 1);
        assert_eq!(questions[index].id, "a");
    }
}
