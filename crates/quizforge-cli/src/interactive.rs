//! Line-oriented driver for a [`TestSession`].

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;

use quizforge_core::model::{
    Question, QuestionBody, RawAnswer, TestMode, TestResults, UserAnswer,
};
use quizforge_core::session::{SessionObserver, TestSession, PRACTICE_ADVANCE_DELAY};
use quizforge_core::timing::start_timing;
use quizforge_core::validator::validate;

/// Prints countdown milestones and signals completion.
pub struct ConsoleObserver {
    done: Arc<Notify>,
}

impl ConsoleObserver {
    pub fn new() -> (Arc<Self>, Arc<Notify>) {
        let done = Arc::new(Notify::new());
        (Arc::new(Self { done: done.clone() }), done)
    }
}

impl SessionObserver for ConsoleObserver {
    fn on_time_update(&self, remaining: u64) {
        if matches!(remaining, 300 | 60 | 30 | 10) {
            println!("\n[{} remaining]", format_duration(remaining));
        }
    }

    fn on_test_complete(&self, _results: &TestResults) {
        self.done.notify_one();
    }
}

/// `95` -> `"1m 35s"`.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

fn print_help() {
    println!("Type an answer and press Enter. Commands:");
    println!("  :next  :prev    move between questions");
    println!("  :pause :resume  stop and restart the clock");
    println!("  :finish         submit the test");
    println!("  :quit           save and exit (continue with `quizforge resume`)");
}

fn print_question(index: usize, total: usize, question: &Question, previous: Option<&UserAnswer>) {
    println!("\nQuestion {}/{} [{}]", index + 1, total, question.kind());
    match &question.body {
        QuestionBody::Text(t) if !t.passage.is_empty() => println!("{}\n", t.passage),
        _ => {}
    }
    println!("{}", question.prompt);
    match &question.body {
        QuestionBody::MultipleChoice(mc) => {
            for (i, choice) in mc.choices.iter().enumerate() {
                println!("  {i}) {choice}");
            }
        }
        QuestionBody::Numeric(n) => {
            if let Some(unit) = &n.unit {
                println!("  (answer in {unit})");
            }
        }
        QuestionBody::Text(_) => {}
    }
    if let Some(answer) = previous {
        println!("  (current answer: {})", answer.user_answer);
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

/// Drive `session` from stdin until it completes, the user quits, or input
/// ends. End of input submits the test.
///
/// Returns the results, or `None` when the user saved and quit.
pub async fn run(
    session: &TestSession,
    done: Arc<Notify>,
    show_explanations: bool,
) -> Result<Option<TestResults>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown: Option<usize> = None;
    let mut answer_started = start_timing();

    print_help();

    loop {
        let Some(state) = session.state() else {
            bail!("session is not initialized");
        };
        if state.is_completed {
            break;
        }
        let index = state.current_question_index;
        let total = state.questions.len();
        if shown != Some(index) {
            if let Some(question) = state.current_question() {
                print_question(index, total, question, state.answers.get(&question.id));
            }
            shown = Some(index);
            answer_started = start_timing();
        }
        prompt()?;

        let line = tokio::select! {
            _ = done.notified() => {
                println!("\nTime is up!");
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            println!();
            session.complete_test()?;
            break;
        };

        match line.trim() {
            "" => {}
            ":help" => print_help(),
            ":next" => session.next_question()?,
            ":prev" => session.previous_question()?,
            ":pause" => {
                session.pause_test()?;
                println!("Paused. Type :resume to continue.");
            }
            ":resume" => {
                session.resume_timer()?;
                println!("Resumed.");
            }
            ":finish" => {
                session.complete_test()?;
                break;
            }
            ":quit" => {
                session.save_progress();
                session.cleanup();
                println!("Progress saved. Continue later with `quizforge resume`.");
                return Ok(None);
            }
            cmd if cmd.starts_with(':') => {
                println!("Unknown command: {cmd}. Type :help for commands.");
            }
            input => {
                if state.is_paused {
                    println!("Paused. Type :resume to continue.");
                    continue;
                }
                let Some(question) = state.current_question() else {
                    continue;
                };
                let raw = RawAnswer::Text(input.to_string());
                let check = validate(Some(&raw), question);
                if !check.is_valid {
                    println!("{}", check.errors.join("; "));
                    continue;
                }

                let Some(result) = session.answer_current(raw, answer_started) else {
                    continue;
                };
                let is_last = index + 1 >= total;
                match state.mode {
                    TestMode::Practice => {
                        println!("{}", result.feedback);
                        if let Some(partial) = result.partial_credit.filter(|p| *p > 0.0) {
                            println!("Partial credit: {:.0}%", partial * 100.0);
                        }
                        if show_explanations && !question.explanation.is_empty() {
                            println!("{}", question.explanation);
                        }
                        if is_last {
                            println!("That was the last question. Type :finish to see your results.");
                        } else {
                            tokio::time::sleep(PRACTICE_ADVANCE_DELAY + Duration::from_millis(100))
                                .await;
                        }
                    }
                    TestMode::Test => {
                        println!("Answer recorded.");
                        if is_last {
                            println!("Last question. Type :finish to submit or :prev to review.");
                        } else {
                            session.next_question()?;
                        }
                    }
                }
            }
        }
    }

    let results = session.results();
    session.cleanup();
    Ok(results)
}

/// Print the final score table.
pub fn print_results(results: &TestResults) {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Test"), Cell::new(&results.test_type)]);
    table.add_row(vec![Cell::new("Mode"), Cell::new(results.mode)]);
    table.add_row(vec![
        Cell::new("Correct"),
        Cell::new(format!(
            "{}/{}",
            results.correct_answers, results.total_questions
        )),
    ]);
    table.add_row(vec![
        Cell::new("Incorrect"),
        Cell::new(results.incorrect_answers),
    ]);
    table.add_row(vec![
        Cell::new("Accuracy"),
        Cell::new(format!("{:.1}%", results.accuracy)),
    ]);
    table.add_row(vec![
        Cell::new("Total time"),
        Cell::new(format_duration(results.total_time_spent)),
    ]);
    table.add_row(vec![
        Cell::new("Avg per answer"),
        Cell::new(format!("{:.1}s", results.average_time_per_question)),
    ]);
    println!("\n{table}");

    if let Some(meta) = &results.metadata {
        let mut breakdown = Table::new();
        breakdown.set_header(vec!["Category", "Correct", "Total"]);
        for (category, b) in &meta.category_breakdown {
            breakdown.add_row(vec![
                Cell::new(category),
                Cell::new(b.correct),
                Cell::new(b.total),
            ]);
        }
        for (difficulty, b) in &meta.difficulty_breakdown {
            breakdown.add_row(vec![
                Cell::new(format!("difficulty: {difficulty}")),
                Cell::new(b.correct),
                Cell::new(b.total),
            ]);
        }
        println!("{breakdown}");
    }
}
