//! # SRS Guard CLI (`srs-guard`)
//!
//! ## Usage
//!
//! ```bash
//! srs-guard --config ./config/srs-guard.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `srs-guard init` | Create the similarity index if it does not exist |
//! | `srs-guard check <file>` | Run one PDF/DOCX through the pipeline and print the decision |
//! | `srs-guard stats` | Show the index and how many documents it holds |
//! | `srs-guard serve` | Start the HTTP server |
//!
//! `check` and `serve` need `OPENAI_API_KEY`; the Pinecone backend also
//! needs `PINECONE_API_KEY`. Log verbosity follows `RUST_LOG` (default
//! `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use srs_guard::{check, config, server, stats};

/// SRS Guard: near-duplicate detection for Software Requirements
/// Specification documents.
#[derive(Parser)]
#[command(
    name = "srs-guard",
    about = "SRS Guard: near-duplicate detection for SRS documents",
    version,
    long_about = "SRS Guard extracts the key sections of an uploaded SRS (PDF or DOCX), \
    summarizes them, embeds the summary, and compares it against every previously admitted \
    document. Documents below the similarity threshold are added to the corpus."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/srs-guard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the similarity index. Safe to run repeatedly.
    Init,

    /// Check one document for plagiarism.
    ///
    /// Prints the decision as JSON. A document judged original is added to
    /// the corpus, exactly as an upload through the server would be.
    Check {
        /// PDF or DOCX file.
        file: PathBuf,
    },

    /// Show corpus statistics.
    Stats,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            check::run_init(&cfg).await?;
        }
        Commands::Check { file } => {
            check::run_check(&cfg, &file).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
