//! The `quizforge init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create quizforge.toml
    if std::path::Path::new("quizforge.toml").exists() {
        println!("quizforge.toml already exists, skipping.");
    } else {
        std::fs::write("quizforge.toml", SAMPLE_CONFIG)?;
        println!("Created quizforge.toml");
    }

    // Create example bank
    std::fs::create_dir_all("question-banks")?;
    let example_path = std::path::Path::new("question-banks/example.toml");
    if example_path.exists() {
        println!("question-banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created question-banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: quizforge validate --bank question-banks");
    println!("  2. Run: quizforge start --category example --count 3");
    println!("  3. Run: quizforge history");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizforge configuration

data_dir = "./.quizforge"
bank_dir = "./question-banks"
default_question_count = 10
# default_time_limit_secs = 600
# storage_quota_bytes = 5242880
bind_addr = "127.0.0.1:8787"
log_filter = "quizforge=info"
"#;

const EXAMPLE_BANK: &str = r#"[category]
id = "example"
name = "Example Questions"
description = "One question of each kind to get started"

[[questions]]
id = "example-planet"
kind = "multiple-choice"
prompt = "Which planet is the largest in the solar system?"
choices = ["Mars", "Jupiter", "Venus", "Mercury"]
correct_answer = 1
difficulty = "easy"
explanation = "Jupiter is more than twice as massive as all the other planets combined."

[[questions]]
id = "example-boiling"
kind = "numeric"
prompt = "At sea level, what temperature does water boil at?"
correct_answer = 100
unit = "°C"
explanation = "Water boils at 100 °C at one standard atmosphere."
chain_of_thought = ["Sea-level pressure is one atmosphere.", "Water boils at 100 °C at that pressure."]

[[questions]]
id = "example-capital"
kind = "text"
prompt = "What is the capital of France?"
correct_answer = "Paris"
explanation = "Paris has been the capital of France since 987."
"#;
