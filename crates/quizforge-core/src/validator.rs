//! Answer validation and normalization.
//!
//! Pure functions that check raw user input against the expected answer
//! shape of a question. Validation failures are returned as data, never as
//! errors.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{MultipleChoice, Question, QuestionBody, RawAnswer};

/// Longest accepted free-text answer, in characters.
pub const MAX_TEXT_LENGTH: usize = 1000;

/// Numeric answers with a larger magnitude are rejected.
pub const MAX_NUMERIC_MAGNITUDE: f64 = 1e15;

pub const MSG_NO_ANSWER: &str = "No answer entered";
pub const MSG_NOT_NUMERIC: &str = "Answer must be numeric";
pub const MSG_INVALID_NUMBER: &str = "Answer must be a valid number";
pub const MSG_NOT_FINITE: &str = "Answer must be finite";
pub const MSG_TOO_LARGE: &str = "Answer is too large";
pub const MSG_EMPTY_TEXT: &str = "Answer cannot be empty";
pub const MSG_TAGS_REMOVED: &str = "HTML tags were removed from the answer";

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());

/// The normalized form of a valid answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum NormalizedAnswer {
    Choice(usize),
    Number(f64),
    Text(String),
}

/// Outcome of validating one raw answer.
///
/// `is_valid` and a non-empty `errors` list coexist only when HTML was
/// stripped from a text answer; the message is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub normalized_value: Option<NormalizedAnswer>,
}

impl ValidationResult {
    fn valid(value: NormalizedAnswer) -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            normalized_value: Some(value),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![message.into()],
            normalized_value: None,
        }
    }
}

/// Validate `raw` against the answer shape of `question`.
pub fn validate(raw: Option<&RawAnswer>, question: &Question) -> ValidationResult {
    let raw = match raw {
        None => return ValidationResult::invalid(MSG_NO_ANSWER),
        Some(RawAnswer::Text(s)) if s.is_empty() => {
            return ValidationResult::invalid(MSG_NO_ANSWER)
        }
        Some(raw) => raw,
    };

    match &question.body {
        QuestionBody::MultipleChoice(mc) => validate_choice(raw, mc),
        QuestionBody::Numeric(_) => validate_number(raw),
        QuestionBody::Text(_) => validate_text(raw),
    }
}

fn validate_choice(raw: &RawAnswer, mc: &MultipleChoice) -> ValidationResult {
    let Some(index) = coerce_integer(raw) else {
        return ValidationResult::invalid(MSG_NOT_NUMERIC);
    };

    let count = mc.choices.len();
    if index < 0 || index as usize >= count {
        return ValidationResult::invalid(format!(
            "Selection must be within range (0 to {})",
            count.saturating_sub(1)
        ));
    }

    ValidationResult::valid(NormalizedAnswer::Choice(index as usize))
}

/// Integer coercion with `parseInt`-like leniency: fractional values are
/// truncated toward zero.
fn coerce_integer(raw: &RawAnswer) -> Option<i64> {
    let value = match raw {
        RawAnswer::Number(n) => *n,
        RawAnswer::Text(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Some(i);
            }
            trimmed.parse::<f64>().ok()?
        }
    };
    value.is_finite().then(|| value.trunc() as i64)
}

fn validate_number(raw: &RawAnswer) -> ValidationResult {
    let value = match raw {
        RawAnswer::Number(n) => *n,
        RawAnswer::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => return ValidationResult::invalid(MSG_INVALID_NUMBER),
        },
    };

    if value.is_nan() {
        return ValidationResult::invalid(MSG_INVALID_NUMBER);
    }
    if value.is_infinite() {
        return ValidationResult::invalid(MSG_NOT_FINITE);
    }
    if value.abs() > MAX_NUMERIC_MAGNITUDE {
        return ValidationResult::invalid(MSG_TOO_LARGE);
    }

    ValidationResult::valid(NormalizedAnswer::Number(value))
}

fn validate_text(raw: &RawAnswer) -> ValidationResult {
    let text = raw.to_string();
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return ValidationResult::invalid(MSG_EMPTY_TEXT);
    }
    if trimmed.chars().count() > MAX_TEXT_LENGTH {
        return ValidationResult::invalid(format!(
            "Answer is too long (maximum {MAX_TEXT_LENGTH} characters)"
        ));
    }

    if !TAG_PATTERN.is_match(trimmed) {
        return ValidationResult::valid(NormalizedAnswer::Text(trimmed.to_string()));
    }

    let sanitized = strip_tags(trimmed);
    if sanitized.is_empty() {
        return ValidationResult::invalid(MSG_EMPTY_TEXT);
    }

    ValidationResult {
        is_valid: true,
        errors: vec![MSG_TAGS_REMOVED.to_string()],
        normalized_value: Some(NormalizedAnswer::Text(sanitized)),
    }
}

/// Remove `<script>`/`<style>` blocks with their contents, then every other tag.
pub fn strip_tags(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(input, "");
    let without_styles = STYLE_BLOCK.replace_all(&without_scripts, "");
    TAG_PATTERN
        .replace_all(&without_styles, "")
        .trim()
        .to_string()
}
