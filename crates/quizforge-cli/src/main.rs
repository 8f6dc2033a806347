//! The `quizforge` binary: quiz sessions, bank tools and the HTTP edge.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::{Directive, LevelFilter};

mod commands;
mod interactive;
mod manifest;

#[derive(Parser)]
#[command(name = "quizforge", version, about = "Timed quiz and benchmark practice")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new randomly drawn test
    Start {
        /// Category id (see `quizforge categories`)
        #[arg(long)]
        category: String,

        /// Number of questions (default from config)
        #[arg(long)]
        count: Option<usize>,

        /// practice or test
        #[arg(long, default_value = "practice")]
        mode: String,

        /// Time limit in seconds (test mode only)
        #[arg(long)]
        time_limit: Option<u64>,
    },

    /// Continue the saved test
    Resume {
        /// Expected category of the saved test
        #[arg(long)]
        category: Option<String>,
    },

    /// List question categories
    Categories,

    /// Show recent results
    History {
        /// Number of results to show
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Run the HTTP edge (feedback and health endpoints)
    Serve {
        /// Listen address (default from config)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Create starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match quizforge_store::load_config_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };

    let default_directive: Directive = config
        .log_filter
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_directive),
        )
        .init();

    let result = match cli.command {
        Commands::Start {
            category,
            count,
            mode,
            time_limit,
        } => commands::start::execute(&config, category, count, mode, time_limit).await,
        Commands::Resume { category } => commands::resume::execute(&config, category).await,
        Commands::Categories => commands::categories::execute(&config).await,
        Commands::History { limit, format } => commands::history::execute(&config, limit, format),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Serve { addr } => commands::serve::execute(&config, addr).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
