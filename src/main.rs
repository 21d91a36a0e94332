//! # spec-rag CLI (`specrag`)
//!
//! Builds and queries a retrieval index over a folder of markdown
//! specifications.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `specrag index` | Build the index (skipped if one exists, unless `--rebuild`) |
//! | `specrag search "<query>"` | Ranked chunks for a query |
//! | `specrag context "<query>"` | Budget-bounded context string for a prompt |
//! | `specrag files` | List indexed files |
//! | `specrag file-summary <path>` | Chunks, sections and preview of one file |
//! | `specrag stats` | Index statistics |
//!
//! ## Examples
//!
//! ```bash
//! # Neural defaults: ./specs into docs/rag/specs.sqlite
//! specrag index
//!
//! # Lexical deployment, no model download
//! specrag --config config/specrag-lite.example.toml index --rebuild
//!
//! specrag search "rate limits" --file api/ --limit 3
//! specrag context "how does auth work?" --max-budget 2000
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use spec_rag::config::{self, Config};
use spec_rag::progress::ProgressMode;
use spec_rag::session::is_missing_index;
use spec_rag::{catalog, ingest, logging, search, stats};

/// spec-rag: retrieval over markdown specifications.
#[derive(Parser)]
#[command(
    name = "specrag",
    about = "Retrieval over a folder of markdown specifications",
    version,
    long_about = "spec-rag parses markdown specifications, chunks and embeds them into a \
    local vector index, and answers queries with ranked chunks or a budget-bounded context \
    string for prompting an LLM."
)]
struct Cli {
    /// Path to a configuration file (TOML).
    ///
    /// Without one, built-in defaults are used: `./specs`, a SQLite index at
    /// `docs/rag/specs.sqlite`, and the local MiniLM embedder.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of markdown specifications (overrides the config file).
    #[arg(long, global = true)]
    specs_dir: Option<PathBuf>,

    /// Index location (overrides the config file).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from the specs directory.
    ///
    /// Does nothing if a populated index already exists, unless
    /// `--rebuild` is given. A rebuild replaces the whole index.
    Index {
        /// Rebuild even if an index exists.
        #[arg(long)]
        rebuild: bool,

        /// Progress output on stderr. Defaults to `human` on a terminal,
        /// `off` otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Search the index.
    Search {
        /// The search query string.
        query: String,

        /// Keep only results whose file path contains this substring.
        #[arg(long)]
        file: Option<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print a context string for a query, sized to a budget.
    Context {
        query: String,

        /// Budget in the configured unit (tokens or characters).
        #[arg(long)]
        max_budget: Option<usize>,
    },

    /// List indexed files.
    Files,

    /// Summarize one indexed file.
    FileSummary {
        /// Relative path as listed by `specrag files`.
        path: String,
    },

    /// Show index statistics.
    Stats,
}

fn load(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::minimal(),
    };
    if let Some(dir) = &cli.specs_dir {
        cfg.corpus.specs_dir = dir.clone();
    }
    if let Some(path) = &cli.db_path {
        cfg.index.path = path.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = load(&cli)?;

    match cli.command {
        Commands::Index { rebuild, progress } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            ingest::run_index(&cfg, rebuild, mode).await?;
        }
        Commands::Search { query, file, limit } => {
            search::run_search(&cfg, &query, file.as_deref(), limit).await?;
        }
        Commands::Context { query, max_budget } => {
            search::run_context(&cfg, &query, max_budget).await?;
        }
        Commands::Files => {
            catalog::run_files(&cfg).await?;
        }
        Commands::FileSummary { path } => {
            catalog::run_file_summary(&cfg, &path).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_tracing(cli.verbose) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_missing_index(&e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run `specrag index` first.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
