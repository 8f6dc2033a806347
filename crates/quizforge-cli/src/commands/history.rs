//! The `quizforge history` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_core::model::TestResults;
use quizforge_store::{create_store, QuizforgeConfig};

use crate::interactive::format_duration;

pub fn execute(config: &QuizforgeConfig, limit: usize, format: String) -> Result<()> {
    let store = create_store(config)?;
    let history: Vec<TestResults> = store.get_history().into_iter().take(limit).collect();

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&history)?),
        "text" => print_table(&history),
        other => anyhow::bail!("unknown format: {other} (expected text or json)"),
    }

    Ok(())
}

fn print_table(history: &[TestResults]) {
    if history.is_empty() {
        println!("No results recorded yet.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Test", "Mode", "Score", "Accuracy", "Time"]);

    for result in history {
        let date = chrono::DateTime::from_timestamp_millis(result.start_time)
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(date),
            Cell::new(&result.test_type),
            Cell::new(result.mode),
            Cell::new(format!(
                "{}/{}",
                result.correct_answers, result.total_questions
            )),
            Cell::new(format!("{:.1}%", result.accuracy)),
            Cell::new(format_duration(result.total_time_spent)),
        ]);
    }

    println!("{table}");
}
