//! Answer scoring.
//!
//! Every scoring call validates first; a validation failure scores zero with
//! an "Input error" feedback rather than failing.

use serde::{Deserialize, Serialize};

use crate::model::{FreeText, MultipleChoice, Numeric, Question, QuestionBody, RawAnswer, UserAnswer};
use crate::timing;
use crate::validator::{validate, NormalizedAnswer};

/// Relative tolerance for numeric answers.
pub const NUMERIC_RELATIVE_TOLERANCE: f64 = 0.01;

/// Absolute tolerance floor for numeric answers near zero.
pub const NUMERIC_MIN_TOLERANCE: f64 = 0.01;

/// Partial credit for numbers falls off linearly over this many tolerances.
pub const PARTIAL_CREDIT_BAND: f64 = 10.0;

/// Keyword overlap at or below this ratio earns no partial credit.
pub const KEYWORD_CREDIT_THRESHOLD: f64 = 0.2;

/// Outcome of scoring one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub is_correct: bool,
    /// Binary score, 0 or 1.
    pub score: u8,
    pub feedback: String,
    /// Fractional credit for near misses; `None` when not applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_credit: Option<f64>,
}

impl ScoreResult {
    fn correct(feedback: impl Into<String>) -> Self {
        Self {
            is_correct: true,
            score: 1,
            feedback: feedback.into(),
            partial_credit: None,
        }
    }

    fn incorrect(feedback: impl Into<String>, partial_credit: Option<f64>) -> Self {
        Self {
            is_correct: false,
            score: 0,
            feedback: feedback.into(),
            partial_credit,
        }
    }
}

/// Score `raw` against `question`.
pub fn score(raw: Option<&RawAnswer>, question: &Question) -> ScoreResult {
    let validation = validate(raw, question);
    let normalized = match (validation.is_valid, validation.normalized_value) {
        (true, Some(value)) => value,
        _ => {
            return ScoreResult::incorrect(
                format!("Input error: {}", validation.errors.join(", ")),
                None,
            )
        }
    };

    match (&question.body, normalized) {
        (QuestionBody::MultipleChoice(mc), NormalizedAnswer::Choice(index)) => {
            score_choice(mc, index)
        }
        (QuestionBody::Numeric(n), NormalizedAnswer::Number(value)) => score_number(n, value),
        (QuestionBody::Text(t), NormalizedAnswer::Text(text)) => score_text(t, &text),
        (_, other) => {
            tracing::warn!(
                question_id = %question.id,
                "validator produced {other:?} for a {} question",
                question.kind()
            );
            ScoreResult::incorrect("Input error: unsupported answer", None)
        }
    }
}

fn score_choice(mc: &MultipleChoice, index: usize) -> ScoreResult {
    if index == mc.correct_answer {
        return ScoreResult::correct("Correct!");
    }
    let correct_text = mc
        .choices
        .get(mc.correct_answer)
        .map(String::as_str)
        .unwrap_or("unknown");
    ScoreResult::incorrect(format!("Incorrect. The correct answer is: {correct_text}"), None)
}

/// Tolerance applied to a numeric answer: 1% of the expected value, at least 0.01.
pub fn numeric_tolerance(correct_answer: f64) -> f64 {
    (correct_answer.abs() * NUMERIC_RELATIVE_TOLERANCE).max(NUMERIC_MIN_TOLERANCE)
}

/// Linear partial credit for a numeric miss of `difference`.
pub fn numeric_partial_credit(difference: f64, tolerance: f64) -> f64 {
    let band = tolerance * PARTIAL_CREDIT_BAND;
    if difference > band {
        return 0.0;
    }
    (1.0 - difference / band).max(0.0)
}

fn score_number(n: &Numeric, value: f64) -> ScoreResult {
    let tolerance = numeric_tolerance(n.correct_answer);
    let difference = (value - n.correct_answer).abs();

    if difference <= tolerance {
        return ScoreResult::correct("Correct!");
    }

    let expected = match &n.unit {
        Some(unit) => format!("{} {}", n.correct_answer, unit),
        None => n.correct_answer.to_string(),
    };
    ScoreResult::incorrect(
        format!("Incorrect. The correct answer is {expected}"),
        Some(numeric_partial_credit(difference, tolerance)),
    )
}

fn normalize_text(s: &str) -> String {
    s.trim().to_lowercase()
}

fn score_text(t: &FreeText, answer: &str) -> ScoreResult {
    let user = normalize_text(answer);
    let correct = normalize_text(&t.correct_answer);

    let matches_alternate = t
        .possible_answers
        .iter()
        .any(|alt| normalize_text(alt) == user);

    if user == correct || matches_alternate {
        return ScoreResult::correct("Correct!");
    }

    let ratio = keyword_overlap(&correct, &user);
    let partial = if ratio > KEYWORD_CREDIT_THRESHOLD {
        ratio
    } else {
        0.0
    };
    ScoreResult::incorrect(
        format!("Incorrect. The correct answer is: {}", t.correct_answer),
        Some(partial),
    )
}

/// Fraction of the expected answer's keywords (tokens longer than two
/// characters) that occur in the user's answer.
pub fn keyword_overlap(correct: &str, user: &str) -> f64 {
    let keywords: Vec<&str> = correct
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .collect();
    if keywords.is_empty() {
        return 0.0;
    }
    let found = keywords.iter().filter(|k| user.contains(*k)).count();
    found as f64 / keywords.len() as f64
}

/// Score an answer and stamp it with timing, producing the record that
/// goes into a session's answer map.
pub fn grade_answer(
    question: &Question,
    raw: RawAnswer,
    answer_start_time: i64,
) -> (UserAnswer, ScoreResult) {
    let result = score(Some(&raw), question);
    let timing = timing::elapsed(answer_start_time, None);
    let answer = UserAnswer {
        question_id: question.id.clone(),
        user_answer: raw,
        is_correct: result.is_correct,
        time_spent: timing.time_spent,
        timestamp: timing.end_time,
    };
    (answer, result)
}
