//! The `quizforge validate` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;

use quizforge_core::parser::{load_bank_directory, parse_bank, validate_bank};
use quizforge_core::traits::QuestionCategory;

pub fn execute(bank: PathBuf) -> Result<()> {
    let categories = if bank.is_dir() {
        load_bank_directory(&bank)?
    } else {
        vec![parse_bank(&bank)?]
    };
    if categories.is_empty() {
        println!("No question banks found in {}.", bank.display());
        return Ok(());
    }

    let warnings: usize = categories.iter().map(report).sum();
    match warnings {
        0 => println!("All question banks valid."),
        n => println!("\n{n} warning(s) found."),
    }
    Ok(())
}

/// Print one category and its warnings; returns the warning count.
fn report(category: &QuestionCategory) -> usize {
    let mut kinds: BTreeMap<String, usize> = BTreeMap::new();
    for question in &category.questions {
        *kinds.entry(question.kind().to_string()).or_default() += 1;
    }
    let kinds = kinds
        .iter()
        .map(|(kind, n)| format!("{n} {kind}"))
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "Category: {} [{}] ({} questions: {kinds})",
        category.name,
        category.id,
        category.pool_size()
    );

    let warnings = validate_bank(category);
    for warning in &warnings {
        match &warning.question_id {
            Some(id) => println!("  [{id}] WARNING: {}", warning.message),
            None => println!("  WARNING: {}", warning.message),
        }
    }
    warnings.len()
}
