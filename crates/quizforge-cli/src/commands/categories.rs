//! The `quizforge categories` command.

use std::sync::Arc;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_core::assembly::load_catalog;
use quizforge_core::bank::DirectoryProvider;
use quizforge_store::QuizforgeConfig;

pub async fn execute(config: &QuizforgeConfig) -> Result<()> {
    let provider = Arc::new(DirectoryProvider::open(&config.bank_dir)?);
    let catalog = load_catalog(provider).await;

    if catalog.categories.is_empty() {
        println!("No categories found in {}.", config.bank_dir.display());
    } else {
        let mut table = Table::new();
        table.set_header(vec!["Id", "Name", "Questions", "Description"]);
        for category in &catalog.categories {
            table.add_row(vec![
                Cell::new(&category.id),
                Cell::new(&category.name),
                Cell::new(category.pool_size()),
                Cell::new(&category.description),
            ]);
        }
        println!("{table}");
    }

    for (id, e) in &catalog.failures {
        eprintln!("WARNING: category '{id}' could not be loaded: {e}");
    }

    Ok(())
}
