//! # mailrag CLI
//!
//! ## Usage
//!
//! ```bash
//! mailrag --config ./mailrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mailrag index` | Walk the corpus, embed every chunk, write the index |
//! | `mailrag query "<question>"` | Retrieve the top-K chunks and generate an answer |
//! | `mailrag search "<question>"` | Retrieve and print the top-K chunks |
//! | `mailrag stats` | Describe the stored index |
//!
//! Log verbosity: `-v` (debug), `-vv` (trace), `-q` (warnings only), or
//! the `MAILRAG_LOG` environment variable with any `tracing` filter.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mailrag::config;
use mailrag::{indexer, query};

/// mailrag: question answering over a directory of email messages.
#[derive(Parser)]
#[command(
    name = "mailrag",
    about = "Question answering over a directory of plain-text email messages",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./mailrag.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from the configured corpus directory.
    ///
    /// Always a full rebuild: the previous index is replaced.
    Index {
        /// Walk and chunk only; report counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Answer a question from the indexed messages.
    Query {
        question: String,

        /// Number of chunks to retrieve (default: retrieval.top_k).
        #[arg(long)]
        k: Option<usize>,

        /// Print the retrieved chunks before the answer.
        #[arg(long)]
        show_context: bool,
    },

    /// Show the chunks most similar to a question, without generating.
    Search {
        question: String,

        /// Number of chunks to retrieve (default: retrieval.top_k).
        #[arg(long)]
        k: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show model, dimensionality, and size of the stored index.
    Stats,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("MAILRAG_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index { dry_run } => {
            indexer::run_index(&cfg, dry_run).await?;
        }
        Commands::Query {
            question,
            k,
            show_context,
        } => {
            query::run_query(&cfg, &question, k, show_context).await?;
        }
        Commands::Search { question, k, json } => {
            query::run_search(&cfg, &question, k, json).await?;
        }
        Commands::Stats => {
            query::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
