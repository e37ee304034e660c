//! # medprep CLI
//!
//! The `medprep` binary tokenizes a medical exam-prep corpus and answers
//! topic queries against the resulting token store.
//!
//! ## Usage
//!
//! ```bash
//! medprep --config ./config/medprep.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `medprep tokenize` | Extract, chunk and tokenize the corpus into the token store |
//! | `medprep content <topic>` | Aggregated content for a topic |
//! | `medprep summarize <topic>` | High-yield points for a topic |
//! | `medprep predict` | Likely exam topics, ranked |
//! | `medprep serve` | Start the HTTP server |
//!
//! Inspection: `extract`, `files`, `token-data`, `stats`, `export`, `validate`.
//!
//! Logs go to stderr (`RUST_LOG` overrides the default `medprep=info`);
//! command output goes to stdout.

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use medprep::chunk::build_record;
use medprep::config;
use medprep::extract::load_source;
use medprep::models::FileType;
use medprep::progress::ProgressMode;
use medprep::{export, ingest, inspect, query, server, stats};

/// medprep: tokenize a medical exam-prep corpus and query it by topic.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "medprep",
    about = "Tokenize a medical exam-prep corpus and query it by topic",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/medprep.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from a single file and print it.
    Extract {
        file: PathBuf,

        /// Print the token record (chunks and counts) as JSON instead.
        #[arg(long)]
        record: bool,
    },

    /// Extract and tokenize every corpus file, replacing the token store.
    Tokenize {
        /// Show per-category file counts without extracting or writing.
        #[arg(long)]
        dry_run: bool,

        /// Progress on stderr. Defaults to `human` on a TTY, `off` otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Print the aggregated corpus content for a topic.
    Content {
        topic: String,
        #[arg(long)]
        json: bool,
    },

    /// Print up to five high-yield points for a topic.
    Summarize {
        topic: String,
        #[arg(long)]
        json: bool,
    },

    /// Rank likely exam topics.
    Predict {
        /// Number of topics (clamped to 1..=50). Defaults to `predict.default_limit`.
        #[arg(long)]
        limit: Option<usize>,

        /// Seed for reproducible rankings. Overrides `predict.seed`.
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        json: bool,
    },

    /// List corpus files per category.
    Files,

    /// Print the token record for one file as JSON.
    TokenData { category: String, filename: String },

    /// Per-category token statistics.
    Stats,

    /// Export token store summaries.
    Export {
        #[command(subcommand)]
        format: ExportFormat,
    },

    /// Check the token store for missing categories and near-empty files.
    Validate,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum ExportFormat {
    /// One CSV row per file.
    Csv {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Sorted distinct tokens.
    Vocab {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("medprep=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Extract { file, record } => {
            let file_type = FileType::from_path(&file)
                .ok_or_else(|| anyhow!("Unsupported file type: {}", file.display()))?;
            let source = load_source(&file, "adhoc", file_type);
            if record {
                let record = build_record(&source, &cfg.chunking.options());
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("{}", source.raw_text);
            }
        }
        Commands::Tokenize { dry_run, progress } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            let reporter = mode.reporter();
            ingest::run_tokenize(&cfg, dry_run, reporter.as_ref()).await?;
        }
        Commands::Content { topic, json } => {
            query::run_content(&cfg, &topic, json)?;
        }
        Commands::Summarize { topic, json } => {
            query::run_summarize(&cfg, &topic, json)?;
        }
        Commands::Predict { limit, seed, json } => {
            query::run_predict(&cfg, limit, seed, json)?;
        }
        Commands::Files => {
            inspect::run_files(&cfg)?;
        }
        Commands::TokenData { category, filename } => {
            inspect::run_token_data(&cfg, &category, &filename)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
        Commands::Export { format } => match format {
            ExportFormat::Csv { output } => {
                export::run_export_csv(&cfg, output.as_deref())?;
            }
            ExportFormat::Vocab { output } => {
                export::run_export_vocab(&cfg, output.as_deref())?;
            }
        },
        Commands::Validate => {
            inspect::run_validate(&cfg)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
