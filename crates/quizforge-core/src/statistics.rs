//! Result aggregation for completed attempts.

use std::collections::{BTreeMap, HashMap};

use crate::model::{
    Breakdown, Question, ResultMetadata, SessionState, TestResults, UserAnswer, UserProgress,
};
use crate::timing::duration_secs;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of `correct` over `total`, 0 when there are no questions.
pub fn accuracy(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(correct as f64 / total as f64 * 100.0)
}

struct Tally {
    correct: usize,
    incorrect: usize,
    total_time_spent: u64,
    average_time_per_question: f64,
}

fn tally(answers: &[UserAnswer], start_time: i64, end_time: i64) -> Tally {
    let correct = answers.iter().filter(|a| a.is_correct).count();
    let total_time_spent = duration_secs(start_time, end_time);
    let average_time_per_question = if answers.is_empty() {
        0.0
    } else {
        total_time_spent as f64 / answers.len() as f64
    };
    Tally {
        correct,
        incorrect: answers.len() - correct,
        total_time_spent,
        average_time_per_question,
    }
}

/// Per-category and per-difficulty correctness over the multiple-choice
/// questions of a session. `None` when no question carries a category.
pub fn breakdowns(
    questions: &[Question],
    answers: &HashMap<String, UserAnswer>,
) -> Option<ResultMetadata> {
    let mut category_breakdown: BTreeMap<String, Breakdown> = BTreeMap::new();
    let mut difficulty_breakdown: BTreeMap<String, Breakdown> = BTreeMap::new();

    for question in questions {
        let (Some(category), Some(difficulty)) = (question.category(), question.difficulty())
        else {
            continue;
        };
        let correct = answers
            .get(&question.id)
            .is_some_and(|a| a.is_correct);

        let entry = category_breakdown.entry(category.to_string()).or_default();
        entry.total += 1;
        let level = difficulty_breakdown.entry(difficulty.to_string()).or_default();
        level.total += 1;
        if correct {
            entry.correct += 1;
            level.correct += 1;
        }
    }

    if category_breakdown.is_empty() {
        return None;
    }
    Some(ResultMetadata {
        category_breakdown,
        difficulty_breakdown,
    })
}

/// Summarize a live session that has just completed at `end_time`.
///
/// Every recorded answer is counted. Answers are listed in question order;
/// answers whose question is not loaded (a resumed session that completed
/// before its questions were attached) follow, by timestamp. Without loaded
/// questions the answered count stands in for the question total.
pub fn session_results(state: &SessionState, end_time: i64) -> TestResults {
    let position: HashMap<&str, usize> = state
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| (q.id.as_str(), i))
        .collect();
    let rank = |a: &UserAnswer| {
        position
            .get(a.question_id.as_str())
            .copied()
            .unwrap_or(usize::MAX)
    };
    let mut answers: Vec<UserAnswer> = state.answers.values().cloned().collect();
    answers.sort_by(|a, b| {
        rank(a)
            .cmp(&rank(b))
            .then_with(|| a.timestamp.cmp(&b.timestamp))
            .then_with(|| a.question_id.cmp(&b.question_id))
    });
    let t = tally(&answers, state.start_time, end_time);
    let total_questions = if state.questions.is_empty() {
        answers.len()
    } else {
        state.questions.len()
    };

    TestResults {
        test_id: state.test_id.clone(),
        test_type: state.test_type.clone(),
        mode: state.mode,
        start_time: state.start_time,
        end_time,
        total_questions,
        correct_answers: t.correct,
        incorrect_answers: t.incorrect,
        accuracy: accuracy(t.correct, total_questions),
        total_time_spent: t.total_time_spent,
        average_time_per_question: t.average_time_per_question,
        answers,
        metadata: breakdowns(&state.questions, &state.answers),
    }
}

/// Summarize a stored progress record. Question bodies are not available
/// here, so no breakdown is produced and answers are listed by timestamp.
pub fn progress_results(
    progress: &UserProgress,
    total_questions: usize,
    end_time: i64,
) -> TestResults {
    let mut answers: Vec<UserAnswer> = progress.answers.values().cloned().collect();
    answers.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.question_id.cmp(&b.question_id))
    });
    let t = tally(&answers, progress.start_time, end_time);

    TestResults {
        test_id: progress.test_id.clone(),
        test_type: progress.test_type.clone(),
        mode: progress.mode,
        start_time: progress.start_time,
        end_time,
        total_questions,
        correct_answers: t.correct,
        incorrect_answers: t.incorrect,
        accuracy: accuracy(t.correct, total_questions),
        total_time_spent: t.total_time_spent,
        average_time_per_question: t.average_time_per_question,
        answers,
        metadata: None,
    }
}
