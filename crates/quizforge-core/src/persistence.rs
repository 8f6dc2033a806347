//! Answer persistence facade.
//!
//! [`AnswerRecorder`] records answers straight into the stored progress
//! record, without a live [`crate::session::TestSession`]. It is the path
//! used by stateless front ends (the CLI between invocations, a request
//! handler) that only have the store to work with.
//!
//! Do not drive the same test through both the recorder and a live session:
//! both write the single progress record and nothing arbitrates between them.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::QuizError;
use crate::model::{Question, RawAnswer, TestResults, UserAnswer, UserProgress};
use crate::scorer::{grade_answer, ScoreResult};
use crate::statistics::progress_results;
use crate::timing::now_ms;
use crate::traits::ProgressStore;

/// Answers needed to call a test complete when the total question count is
/// unknown.
pub const DEFAULT_COMPLETION_THRESHOLD: usize = 20;

/// Result of [`AnswerRecorder::submit_answer`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub answer: UserAnswer,
    pub score: ScoreResult,
    /// The question already had an answer, which this one replaced.
    pub was_already_answered: bool,
    /// Set when this answer completed the test.
    pub completed: Option<TestResults>,
}

/// Findings of [`AnswerRecorder::validate_answer_data`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDataReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Records, edits and inspects answers in the stored progress record.
pub struct AnswerRecorder {
    store: Arc<dyn ProgressStore>,
    total_questions: Option<usize>,
}

impl AnswerRecorder {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self {
            store,
            total_questions: None,
        }
    }

    /// Use the real question count as the completion threshold. A count of
    /// zero means the total is unknown.
    pub fn with_total_questions(mut self, total: usize) -> Self {
        self.total_questions = (total > 0).then_some(total);
        self
    }

    /// Number of answers that marks the test complete.
    pub fn completion_threshold(&self) -> usize {
        self.total_questions.unwrap_or(DEFAULT_COMPLETION_THRESHOLD)
    }

    /// Grade and record an answer for `question_id`, replacing any earlier
    /// answer to it.
    ///
    /// Fails with [`QuizError::NoActiveTest`] when nothing is in progress.
    /// When the answer count reaches [`Self::completion_threshold`], results
    /// are appended to history and the progress is marked completed.
    pub fn submit_answer(
        &self,
        question_id: &str,
        raw: RawAnswer,
        question: &Question,
        answer_start_time: i64,
    ) -> Result<SubmitOutcome, QuizError> {
        let mut progress = self.store.get_progress().ok_or(QuizError::NoActiveTest)?;

        let was_already_answered = progress.answers.contains_key(question_id);
        let (mut answer, score) = grade_answer(question, raw, answer_start_time);
        answer.question_id = question_id.to_string();
        progress
            .answers
            .insert(question_id.to_string(), answer.clone());

        self.store.save_progress(&progress)?;

        let mut completed = None;
        if !progress.is_completed && progress.answers.len() >= self.completion_threshold() {
            let total = self.total_questions.unwrap_or(progress.answers.len());
            let results = progress_results(&progress, total, now_ms());
            self.store.add_result(&results)?;
            progress.is_completed = true;
            self.store.save_progress(&progress)?;
            tracing::info!(
                test_id = %results.test_id,
                answered = progress.answers.len(),
                "test completed from recorded answers"
            );
            completed = Some(results);
        }

        Ok(SubmitOutcome {
            answer,
            score,
            was_already_answered,
            completed,
        })
    }

    /// Remove the answer to `question_id`. Returns `false` when nothing was
    /// removed or the write failed.
    pub fn delete_answer(&self, question_id: &str) -> bool {
        let Some(mut progress) = self.store.get_progress() else {
            return false;
        };
        if progress.answers.remove(question_id).is_none() {
            return false;
        }
        progress.is_completed = false;
        self.write(&progress)
    }

    /// Remove every answer. Returns `false` when there is no active test or
    /// the write failed.
    pub fn clear_all_answers(&self) -> bool {
        let Some(mut progress) = self.store.get_progress() else {
            return false;
        };
        progress.answers.clear();
        progress.is_completed = false;
        self.write(&progress)
    }

    fn write(&self, progress: &UserProgress) -> bool {
        match self.store.save_progress(progress) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(test_id = %progress.test_id, "failed to update answers: {e}");
                false
            }
        }
    }

    pub fn get_answer(&self, question_id: &str) -> Option<UserAnswer> {
        self.store
            .get_progress()
            .and_then(|mut p| p.answers.remove(question_id))
    }

    pub fn get_all_answers(&self) -> HashMap<String, UserAnswer> {
        self.store
            .get_progress()
            .map(|p| p.answers)
            .unwrap_or_default()
    }

    /// Sorted for stable output.
    pub fn get_answered_question_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.get_all_answers().into_keys().collect();
        ids.sort();
        ids
    }

    pub fn is_question_answered(&self, question_id: &str) -> bool {
        self.store
            .get_progress()
            .is_some_and(|p| p.answers.contains_key(question_id))
    }

    /// Structural check of the stored answers.
    ///
    /// Keys that differ only by case are reported as warnings.
    pub fn validate_answer_data(&self) -> AnswerDataReport {
        let Some(progress) = self.store.get_progress() else {
            return AnswerDataReport {
                is_valid: true,
                ..Default::default()
            };
        };

        let mut report = AnswerDataReport::default();
        let mut keys: Vec<&String> = progress.answers.keys().collect();
        keys.sort();

        for &key in &keys {
            let answer = &progress.answers[key];
            if answer.question_id.trim().is_empty() {
                report.errors.push(format!("answer '{key}' is missing a question id"));
            } else if answer.question_id != *key {
                report.errors.push(format!(
                    "answer stored under '{key}' belongs to '{}'",
                    answer.question_id
                ));
            }
            if answer.time_spent < 0 {
                report
                    .errors
                    .push(format!("answer '{key}' has negative time spent"));
            }
            if answer.timestamp <= 0 {
                report
                    .errors
                    .push(format!("answer '{key}' has an invalid timestamp"));
            }
        }

        let mut seen: HashMap<String, &String> = HashMap::new();
        for &key in &keys {
            if let Some(first) = seen.insert(key.to_lowercase(), key) {
                report
                    .warnings
                    .push(format!("duplicate question id: '{first}' and '{key}'"));
            }
        }

        report.is_valid = report.errors.is_empty();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::{Difficulty, TestMode};

    fn question(id: &str) -> Question {
        Question::multiple_choice(
            id,
            "Pick b",
            vec!["a".into(), "b".into()],
            1,
            "letters",
            Difficulty::Easy,
        )
    }

    fn store_with_test() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .save_progress(&UserProgress {
                test_id: "letters_practice_1".into(),
                test_type: "letters".into(),
                mode: TestMode::Practice,
                start_time: now_ms() - 60_000,
                current_question_index: 0,
                answers: HashMap::new(),
                time_remaining: None,
                is_completed: false,
            })
            .unwrap();
        store
    }

    #[test]
    fn submit_without_test_fails() {
        let recorder = AnswerRecorder::new(Arc::new(MemoryStore::new()));
        let err = recorder
            .submit_answer("q1", 1usize.into(), &question("q1"), now_ms())
            .unwrap_err();
        assert!(matches!(err, QuizError::NoActiveTest));
    }

    #[test]
    fn submit_then_overwrite() {
        let store = store_with_test();
        let recorder = AnswerRecorder::new(store.clone());
        let q = question("q1");

        let first = recorder.submit_answer("q1", 0usize.into(), &q, now_ms()).unwrap();
        assert!(!first.was_already_answered);
        assert!(!first.score.is_correct);

        let second = recorder.submit_answer("q1", 1usize.into(), &q, now_ms()).unwrap();
        assert!(second.was_already_answered);
        assert!(second.score.is_correct);
        assert!(recorder.get_answer("q1").unwrap().is_correct);
        assert_eq!(recorder.get_all_answers().len(), 1);
    }

    #[test]
    fn default_threshold_is_twenty_answers() {
        let store = store_with_test();
        let recorder = AnswerRecorder::new(store.clone());

        for i in 0..19 {
            let id = format!("q{i}");
            let outcome = recorder
                .submit_answer(&id, 1usize.into(), &question(&id), now_ms())
                .unwrap();
            assert!(outcome.completed.is_none());
        }
        let outcome = recorder
            .submit_answer("q19", 1usize.into(), &question("q19"), now_ms())
            .unwrap();
        let results = outcome.completed.unwrap();
        assert_eq!(results.total_questions, 20);
        assert_eq!(results.accuracy, 100.0);
        assert!(results.metadata.is_none());
        assert!(store.get_progress().unwrap().is_completed);
        assert_eq!(store.get_history().len(), 1);

        // Already completed: further answers do not append again.
        recorder
            .submit_answer("q0", 0usize.into(), &question("q0"), now_ms())
            .unwrap();
        assert_eq!(store.get_history().len(), 1);
    }

    #[test]
    fn known_total_sets_threshold() {
        let store = store_with_test();
        let recorder = AnswerRecorder::new(store.clone()).with_total_questions(2);
        recorder
            .submit_answer("a", 1usize.into(), &question("a"), now_ms())
            .unwrap();
        let outcome = recorder
            .submit_answer("b", 0usize.into(), &question("b"), now_ms())
            .unwrap();
        let results = outcome.completed.unwrap();
        assert_eq!(results.total_questions, 2);
        assert_eq!(results.accuracy, 50.0);
    }

    #[test]
    fn zero_total_falls_back_to_default_threshold() {
        let store = store_with_test();
        let recorder = AnswerRecorder::new(store.clone()).with_total_questions(0);
        assert_eq!(recorder.completion_threshold(), DEFAULT_COMPLETION_THRESHOLD);

        let outcome = recorder
            .submit_answer("a", 1usize.into(), &question("a"), now_ms())
            .unwrap();
        assert!(outcome.completed.is_none());
        assert!(!store.get_progress().unwrap().is_completed);
        assert!(store.get_history().is_empty());
    }

    #[test]
    fn delete_and_clear_reset_completion() {
        let store = store_with_test();
        let recorder = AnswerRecorder::new(store.clone()).with_total_questions(1);
        recorder
            .submit_answer("a", 1usize.into(), &question("a"), now_ms())
            .unwrap();
        assert!(store.get_progress().unwrap().is_completed);

        assert!(!recorder.delete_answer("missing"));
        assert!(recorder.delete_answer("a"));
        assert!(!store.get_progress().unwrap().is_completed);
        assert!(!recorder.is_question_answered("a"));

        recorder
            .submit_answer("b", 1usize.into(), &question("b"), now_ms())
            .unwrap();
        assert!(recorder.clear_all_answers());
        assert!(recorder.get_answered_question_ids().is_empty());
    }

    #[test]
    fn storage_failure_becomes_false() {
        let store = store_with_test();
        let recorder = AnswerRecorder::new(store.clone());
        recorder
            .submit_answer("a", 1usize.into(), &question("a"), now_ms())
            .unwrap();
        store.set_full(true);
        assert!(!recorder.clear_all_answers());

        let err = recorder
            .submit_answer("b", 1usize.into(), &question("b"), now_ms())
            .unwrap_err();
        assert_eq!(err.code(), "STORAGE_ERROR");
    }

    #[test]
    fn reads_degrade_without_test() {
        let recorder = AnswerRecorder::new(Arc::new(MemoryStore::new()));
        assert!(recorder.get_answer("q").is_none());
        assert!(recorder.get_all_answers().is_empty());
        assert!(!recorder.is_question_answered("q"));
        assert!(!recorder.delete_answer("q"));
        assert!(!recorder.clear_all_answers());
        assert!(recorder.validate_answer_data().is_valid);
    }

    #[test]
    fn validation_flags_bad_records() {
        let store = store_with_test();
        let mut progress = store.get_progress().unwrap();
        let good = UserAnswer {
            question_id: "Q1".into(),
            user_answer: RawAnswer::Number(1.0),
            is_correct: true,
            time_spent: 3,
            timestamp: 1_700_000_000_000,
        };
        progress.answers.insert("Q1".into(), good.clone());
        progress.answers.insert(
            "q1".into(),
            UserAnswer {
                question_id: "q1".into(),
                ..good.clone()
            },
        );
        progress.answers.insert(
            "q2".into(),
            UserAnswer {
                question_id: "".into(),
                time_spent: -4,
                timestamp: 0,
                ..good
            },
        );
        store.save_progress(&progress).unwrap();

        let report = AnswerRecorder::new(store).validate_answer_data();
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 3);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("Q1"));
    }
}
