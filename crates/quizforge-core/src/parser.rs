//! TOML question bank parser.
//!
//! Loads question categories from TOML files and directories, and validates them.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::model::{
    Difficulty, FreeText, MultipleChoice, Numeric, Question, QuestionBody, QuestionKind,
    TextAnswerType,
};
use crate::traits::QuestionCategory;

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    category: TomlCategoryHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlCategoryHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    test_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    kind: String,
    prompt: String,
    #[serde(default)]
    explanation: String,
    correct_answer: toml::Value,
    #[serde(default)]
    metadata: BTreeMap<String, toml::Value>,

    // multiple-choice
    #[serde(default)]
    choices: Vec<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,

    // numeric
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    chain_of_thought: Vec<String>,

    // text
    #[serde(default)]
    passage: String,
    #[serde(default)]
    question_type: Option<String>,
    #[serde(default)]
    possible_answers: Vec<String>,
}

/// Parse a single bank file.
pub fn parse_bank(path: &Path) -> Result<QuestionCategory> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse bank TOML from a string (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionCategory> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let header = parsed.category;
    let mut seen = HashSet::new();
    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            if !seen.insert(q.id.clone()) {
                bail!("duplicate question id: {}", q.id);
            }
            convert_question(q, &header.id)
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid question bank: {}", source_path.display()))?;

    Ok(QuestionCategory {
        test_type: header.test_type.unwrap_or_else(|| header.id.clone()),
        id: header.id,
        name: header.name,
        description: header.description,
        questions,
    })
}

fn convert_question(q: TomlQuestion, default_category: &str) -> Result<Question> {
    let kind: QuestionKind = q
        .kind
        .parse()
        .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;

    let body = match kind {
        QuestionKind::MultipleChoice => {
            if q.choices.is_empty() {
                bail!("question {}: multiple-choice question has no choices", q.id);
            }
            let correct_answer = q
                .correct_answer
                .as_integer()
                .and_then(|i| usize::try_from(i).ok())
                .with_context(|| {
                    format!("question {}: correct_answer must be a choice index", q.id)
                })?;
            if correct_answer >= q.choices.len() {
                bail!(
                    "question {}: correct_answer {} is out of range (0 to {})",
                    q.id,
                    correct_answer,
                    q.choices.len() - 1
                );
            }
            let difficulty: Difficulty = match q.difficulty {
                Some(d) => d
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?,
                None => Difficulty::Medium,
            };
            QuestionBody::MultipleChoice(MultipleChoice {
                choices: q.choices,
                correct_answer,
                category: q.category.unwrap_or_else(|| default_category.to_string()),
                difficulty,
            })
        }
        QuestionKind::Numeric => {
            let correct_answer = match &q.correct_answer {
                toml::Value::Integer(i) => *i as f64,
                toml::Value::Float(f) if f.is_finite() => *f,
                _ => bail!("question {}: correct_answer must be a finite number", q.id),
            };
            QuestionBody::Numeric(Numeric {
                correct_answer,
                unit: q.unit,
                chain_of_thought: q.chain_of_thought,
            })
        }
        QuestionKind::Text => {
            let correct_answer = match q.correct_answer {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                _ => bail!("question {}: correct_answer must be a string", q.id),
            };
            let question_type: TextAnswerType = match q.question_type {
                Some(t) => t
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?,
                None => TextAnswerType::default(),
            };
            QuestionBody::Text(FreeText {
                correct_answer,
                passage: q.passage,
                question_type,
                possible_answers: q.possible_answers,
            })
        }
    };

    let metadata = q
        .metadata
        .into_iter()
        .map(|(k, v)| Ok::<_, anyhow::Error>((k, serde_json::to_value(v)?)))
        .collect::<Result<BTreeMap<_, _>>>()?;

    Ok(Question {
        id: q.id,
        prompt: q.prompt,
        explanation: q.explanation,
        metadata,
        body,
    })
}

/// Recursively load all `.toml` bank files from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionCategory>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }

    for path in bank_files(dir)? {
        match parse_bank(&path) {
            Ok(bank) => banks.push(bank),
            Err(e) => {
                tracing::warn!("skipping {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(banks)
}

/// Every `.toml` file under `dir`, recursively, in path order.
pub fn bank_files(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(bank_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// A non-fatal issue found in a question bank.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    pub message: String,
}

/// Check a loaded bank for problems that do not prevent loading.
pub fn validate_bank(category: &QuestionCategory) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if category.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "category has no questions".into(),
        });
    }

    for q in &category.questions {
        if q.prompt.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "prompt is empty".into(),
            });
        }
        if q.explanation.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "no explanation provided".into(),
            });
        }
        if let QuestionBody::MultipleChoice(mc) = &q.body {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for choice in &mc.choices {
                *counts.entry(choice.trim().to_lowercase()).or_default() += 1;
            }
            if counts.values().any(|&n| n > 1) {
                warnings.push(ValidationWarning {
                    question_id: Some(q.id.clone()),
                    message: "duplicate choices".into(),
                });
            }
        }
    }

    // A unit on some numeric questions suggests the rest need one too.
    let numeric: Vec<(&str, &Numeric)> = category
        .questions
        .iter()
        .filter_map(|q| match &q.body {
            QuestionBody::Numeric(n) => Some((q.id.as_str(), n)),
            _ => None,
        })
        .collect();
    if numeric.iter().any(|(_, n)| n.unit.is_some()) {
        for (id, n) in &numeric {
            if n.unit.is_none() {
                warnings.push(ValidationWarning {
                    question_id: Some(id.to_string()),
                    message: "numeric question has no unit while others do".into(),
                });
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = r#"
[category]
id = "astronomy"
name = "Astronomy"
description = "The solar system"

[[questions]]
id = "astro-1"
kind = "multiple-choice"
prompt = "Largest planet?"
explanation = "Jupiter is the largest."
choices = ["Mars", "Jupiter", "Venus"]
correct_answer = 1
difficulty = "easy"

[[questions]]
id = "astro-2"
kind = "numeric"
prompt = "Planets in the solar system?"
explanation = "Pluto was reclassified in 2006."
correct_answer = 8

[[questions]]
id = "astro-3"
kind = "text"
prompt = "Closest star to Earth?"
explanation = "We orbit it."
correct_answer = "The Sun"
possible_answers = ["Sun", "Sol"]

[questions.metadata]
source = "common knowledge"
"#;

    fn parse(content: &str) -> Result<QuestionCategory> {
        parse_bank_str(content, Path::new("test.toml"))
    }

    #[test]
    fn parses_all_kinds() {
        let bank = parse(BANK).unwrap();
        assert_eq!(bank.id, "astronomy");
        assert_eq!(bank.test_type, "astronomy");
        assert_eq!(bank.pool_size(), 3);

        let mc = &bank.questions[0];
        assert_eq!(mc.kind(), QuestionKind::MultipleChoice);
        assert_eq!(mc.category(), Some("astronomy"));
        assert_eq!(mc.difficulty(), Some(Difficulty::Easy));

        match &bank.questions[1].body {
            QuestionBody::Numeric(n) => assert_eq!(n.correct_answer, 8.0),
            other => panic!("expected numeric, got {other:?}"),
        }

        let text = &bank.questions[2];
        assert_eq!(text.correct_answer_text(), "The Sun");
        assert_eq!(
            text.metadata["source"],
            serde_json::json!("common knowledge")
        );
    }

    #[test]
    fn rejects_unknown_kind() {
        let content = r#"
[category]
id = "c"
name = "C"

[[questions]]
id = "q"
kind = "essay"
prompt = "?"
correct_answer = "x"
"#;
        let err = format!("{:#}", parse(content).unwrap_err());
        assert!(err.contains("unknown question kind"), "{err}");
    }

    #[test]
    fn rejects_out_of_range_choice() {
        let content = r#"
[category]
id = "c"
name = "C"

[[questions]]
id = "q"
kind = "multiple-choice"
prompt = "?"
choices = ["a", "b"]
correct_answer = 2
"#;
        let err = format!("{:#}", parse(content).unwrap_err());
        assert!(err.contains("out of range"), "{err}");
    }

    #[test]
    fn rejects_empty_choices_and_duplicates() {
        let empty = r#"
[category]
id = "c"
name = "C"

[[questions]]
id = "q"
kind = "multiple-choice"
prompt = "?"
choices = []
correct_answer = 0
"#;
        assert!(parse(empty).is_err());

        let dup = r#"
[category]
id = "c"
name = "C"

[[questions]]
id = "q"
kind = "numeric"
prompt = "?"
correct_answer = 1

[[questions]]
id = "q"
kind = "numeric"
prompt = "?"
correct_answer = 2
"#;
        let err = format!("{:#}", parse(dup).unwrap_err());
        assert!(err.contains("duplicate question id"), "{err}");
    }

    #[test]
    fn directory_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.toml"), BANK).unwrap();
        std::fs::write(dir.path().join("bad.toml"), "not [valid").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(
            dir.path().join("nested/more.toml"),
            BANK.replace("astronomy", "space"),
        )
        .unwrap();

        let banks = load_bank_directory(dir.path()).unwrap();
        let mut ids: Vec<_> = banks.iter().map(|b| b.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["astronomy", "space"]);
    }

    #[test]
    fn validation_warnings() {
        let content = r#"
[category]
id = "c"
name = "C"

[[questions]]
id = "mc"
kind = "multiple-choice"
prompt = " "
explanation = "x"
choices = ["Yes", "yes"]
correct_answer = 0

[[questions]]
id = "n1"
kind = "numeric"
prompt = "Distance?"
explanation = "x"
correct_answer = 3.5
unit = "km"

[[questions]]
id = "n2"
kind = "numeric"
prompt = "Another distance?"
correct_answer = 2
"#;
        let warnings = validate_bank(&parse(content).unwrap());
        let messages: Vec<_> = warnings
            .iter()
            .map(|w| format!("{}: {}", w.question_id.as_deref().unwrap_or("-"), w.message))
            .collect();
        assert!(messages.contains(&"mc: prompt is empty".to_string()));
        assert!(messages.contains(&"mc: duplicate choices".to_string()));
        assert!(messages.contains(&"n2: no explanation provided".to_string()));
        assert!(messages.contains(&"n2: numeric question has no unit while others do".to_string()));
        assert_eq!(warnings.len(), 4);
    }
}
