//! Core data model types for quizforge.
//!
//! Questions, recorded answers, the live session state, and the two
//! persisted projections of a session: [`UserProgress`] for resume and
//! [`TestResults`] for history.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single question drawn from a question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique identifier within the bank.
    pub id: String,
    /// The text shown to the user.
    pub prompt: String,
    /// Shown after answering in practice mode, or on the results page.
    #[serde(default)]
    pub explanation: String,
    /// Free-form metadata carried through from the bank.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Kind-specific shape of the question and its expected answer.
    #[serde(flatten)]
    pub body: QuestionBody,
}

/// The closed set of question kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuestionBody {
    MultipleChoice(MultipleChoice),
    Numeric(Numeric),
    Text(FreeText),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoice {
    /// Ordered answer options.
    pub choices: Vec<String>,
    /// Zero-based index into `choices`.
    pub correct_answer: usize,
    pub category: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Numeric {
    pub correct_answer: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Worked solution, one step per entry.
    #[serde(default)]
    pub chain_of_thought: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeText {
    pub correct_answer: String,
    /// Supporting passage the question is about.
    #[serde(default)]
    pub passage: String,
    #[serde(default)]
    pub question_type: TextAnswerType,
    /// Alternate spellings accepted as fully correct.
    #[serde(default)]
    pub possible_answers: Vec<String>,
}

/// Which kind of question a [`Question`] is, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    Numeric,
    Text,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::MultipleChoice => write!(f, "multiple-choice"),
            QuestionKind::Numeric => write!(f, "numeric"),
            QuestionKind::Text => write!(f, "text"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multiple-choice" | "multiple_choice" | "mc" => Ok(QuestionKind::MultipleChoice),
            "numeric" | "number" => Ok(QuestionKind::Numeric),
            "text" => Ok(QuestionKind::Text),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// What a free-text answer is expected to look like.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnswerType {
    Numeric,
    #[default]
    Span,
    Date,
}

impl FromStr for TextAnswerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "numeric" => Ok(TextAnswerType::Numeric),
            "span" => Ok(TextAnswerType::Span),
            "date" => Ok(TextAnswerType::Date),
            other => Err(format!("unknown text question type: {other}")),
        }
    }
}

impl Question {
    pub fn multiple_choice(
        id: impl Into<String>,
        prompt: impl Into<String>,
        choices: Vec<String>,
        correct_answer: usize,
        category: impl Into<String>,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            explanation: String::new(),
            metadata: BTreeMap::new(),
            body: QuestionBody::MultipleChoice(MultipleChoice {
                choices,
                correct_answer,
                category: category.into(),
                difficulty,
            }),
        }
    }

    pub fn numeric(id: impl Into<String>, prompt: impl Into<String>, correct_answer: f64) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            explanation: String::new(),
            metadata: BTreeMap::new(),
            body: QuestionBody::Numeric(Numeric {
                correct_answer,
                unit: None,
                chain_of_thought: Vec::new(),
            }),
        }
    }

    pub fn text(
        id: impl Into<String>,
        prompt: impl Into<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            explanation: String::new(),
            metadata: BTreeMap::new(),
            body: QuestionBody::Text(FreeText {
                correct_answer: correct_answer.into(),
                passage: String::new(),
                question_type: TextAnswerType::Span,
                possible_answers: Vec::new(),
            }),
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// Set the unit of a numeric question. No effect on other kinds.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        if let QuestionBody::Numeric(n) = &mut self.body {
            n.unit = Some(unit.into());
        }
        self
    }

    /// Set accepted alternates of a text question. No effect on other kinds.
    pub fn with_possible_answers(mut self, answers: Vec<String>) -> Self {
        if let QuestionBody::Text(t) = &mut self.body {
            t.possible_answers = answers;
        }
        self
    }

    pub fn kind(&self) -> QuestionKind {
        match &self.body {
            QuestionBody::MultipleChoice(_) => QuestionKind::MultipleChoice,
            QuestionBody::Numeric(_) => QuestionKind::Numeric,
            QuestionBody::Text(_) => QuestionKind::Text,
        }
    }

    /// Category of a multiple-choice question; other kinds carry none.
    pub fn category(&self) -> Option<&str> {
        match &self.body {
            QuestionBody::MultipleChoice(mc) => Some(mc.category.as_str()),
            _ => None,
        }
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        match &self.body {
            QuestionBody::MultipleChoice(mc) => Some(mc.difficulty),
            _ => None,
        }
    }

    /// Human-readable rendering of the expected answer.
    pub fn correct_answer_text(&self) -> String {
        match &self.body {
            QuestionBody::MultipleChoice(mc) => mc
                .choices
                .get(mc.correct_answer)
                .cloned()
                .unwrap_or_else(|| mc.correct_answer.to_string()),
            QuestionBody::Numeric(n) => match &n.unit {
                Some(unit) => format!("{} {}", n.correct_answer, unit),
                None => n.correct_answer.to_string(),
            },
            QuestionBody::Text(t) => t.correct_answer.clone(),
        }
    }
}

/// Raw user input exactly as submitted by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAnswer {
    Number(f64),
    Text(String),
}

impl fmt::Display for RawAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawAnswer::Number(n) => write!(f, "{n}"),
            RawAnswer::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for RawAnswer {
    fn from(s: &str) -> Self {
        RawAnswer::Text(s.to_string())
    }
}

impl From<String> for RawAnswer {
    fn from(s: String) -> Self {
        RawAnswer::Text(s)
    }
}

impl From<f64> for RawAnswer {
    fn from(n: f64) -> Self {
        RawAnswer::Number(n)
    }
}

impl From<usize> for RawAnswer {
    fn from(n: usize) -> Self {
        RawAnswer::Number(n as f64)
    }
}

/// One scored answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: String,
    /// The input as entered, never the normalized form.
    pub user_answer: RawAnswer,
    pub is_correct: bool,
    /// Whole seconds, at least 1.
    pub time_spent: i64,
    /// Epoch milliseconds when the answer was recorded.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// Immediate feedback and auto-advance.
    #[default]
    Practice,
    /// Feedback withheld until completion, optional time limit.
    Test,
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestMode::Practice => write!(f, "practice"),
            TestMode::Test => write!(f, "test"),
        }
    }
}

impl FromStr for TestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "practice" => Ok(TestMode::Practice),
            "test" | "exam" => Ok(TestMode::Test),
            other => Err(format!("unknown test mode: {other}")),
        }
    }
}

/// Live state of one test attempt, owned by the session state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub test_id: String,
    pub test_type: String,
    pub mode: TestMode,
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    pub answers: HashMap<String, UserAnswer>,
    /// Epoch milliseconds.
    pub start_time: i64,
    pub end_time: Option<i64>,
    /// Seconds left; only set in test mode with a time limit.
    pub time_remaining: Option<u64>,
    pub is_completed: bool,
    pub is_paused: bool,
}

impl SessionState {
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// The storage-facing projection used for resume.
    pub fn to_progress(&self) -> UserProgress {
        UserProgress {
            test_id: self.test_id.clone(),
            test_type: self.test_type.clone(),
            mode: self.mode,
            start_time: self.start_time,
            current_question_index: self.current_question_index,
            answers: self.answers.clone(),
            time_remaining: self.time_remaining,
            is_completed: self.is_completed,
        }
    }
}

/// Durable subset of [`SessionState`]. Question bodies are not included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub test_id: String,
    pub test_type: String,
    pub mode: TestMode,
    pub start_time: i64,
    pub current_question_index: usize,
    #[serde(default)]
    pub answers: HashMap<String, UserAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<u64>,
    #[serde(default)]
    pub is_completed: bool,
}

/// Immutable summary of a completed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub test_id: String,
    pub test_type: String,
    pub mode: TestMode,
    pub start_time: i64,
    pub end_time: i64,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub incorrect_answers: usize,
    /// Percentage in `0..=100`, rounded to two decimals.
    pub accuracy: f64,
    /// Seconds.
    pub total_time_spent: u64,
    /// Seconds.
    pub average_time_per_question: f64,
    pub answers: Vec<UserAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResultMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    #[serde(default)]
    pub category_breakdown: BTreeMap<String, Breakdown>,
    #[serde(default)]
    pub difficulty_breakdown: BTreeMap<String, Breakdown>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub correct: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: String,
    pub show_explanations: bool,
    pub sound_enabled: bool,
    pub default_mode: TestMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_time_limit_secs: Option<u64>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
            show_explanations: true,
            sound_enabled: false,
            default_mode: TestMode::Practice,
            default_time_limit_secs: None,
        }
    }
}

/// Partial preferences; `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub show_explanations: Option<bool>,
    #[serde(default)]
    pub sound_enabled: Option<bool>,
    #[serde(default)]
    pub default_mode: Option<TestMode>,
    #[serde(default)]
    pub default_time_limit_secs: Option<Option<u64>>,
}

impl UserPreferences {
    /// Shallow merge of `update` into `self`.
    pub fn merge(&mut self, update: &PreferencesUpdate) {
        if let Some(theme) = &update.theme {
            self.theme = theme.clone();
        }
        if let Some(v) = update.show_explanations {
            self.show_explanations = v;
        }
        if let Some(v) = update.sound_enabled {
            self.sound_enabled = v;
        }
        if let Some(mode) = update.default_mode {
            self.default_mode = mode;
        }
        if let Some(limit) = update.default_time_limit_secs {
            self.default_time_limit_secs = limit;
        }
    }
}
