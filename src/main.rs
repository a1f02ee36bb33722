//! # Code Archive CLI (`carc`)
//!
//! The `carc` binary indexes configured legacy project roots into a local
//! vector index and searches them semantically.
//!
//! ## Usage
//!
//! ```bash
//! carc --config ./config/carc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `carc init` | Create the SQLite database and schema |
//! | `carc index` | Incrementally index every configured project root |
//! | `carc search "<query>"` | Semantic search over indexed code |
//! | `carc stats` | Show what is indexed, per project |
//! | `carc serve mcp` | Start the tool server (JSON routes and MCP at `/mcp`) |
//! | `carc completions <shell>` | Print shell completions |
//!
//! Logs go to stderr and honour `RUST_LOG` (default `info`).

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use code_archive::app::Archive;
use code_archive::progress::ProgressMode;
use code_archive::{config, migrate, render, server, stats};

/// Code Archive CLI — incremental semantic indexing of legacy codebases.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/carc.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "carc",
    about = "Code Archive — incremental semantic indexing and search over legacy source trees",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/carc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `code_units` table. Safe to
    /// run repeatedly.
    Init,

    /// Index every configured project root.
    ///
    /// Adds new files, re-indexes files whose modification time moved by at
    /// least one second, and removes files that no longer exist. Per-file
    /// failures are reported and retried on the next run.
    Index {
        /// Scan and diff only; do not read, embed, or write anything.
        #[arg(long)]
        dry_run: bool,

        /// Print the run result as JSON on stdout.
        #[arg(long)]
        json: bool,

        /// Progress on stderr: `auto`, `off`, `human`, or `json`.
        #[arg(long, default_value = "auto")]
        progress: String,
    },

    /// Search indexed code by semantic similarity.
    ///
    /// Scores are cosine distances: lower is closer.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results (clamped to 1..=20).
        #[arg(long)]
        limit: Option<i64>,

        /// Restrict results to one project root.
        #[arg(long)]
        project: Option<String>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show index statistics.
    Stats,

    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },

    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the tool server on `[server].bind`.
    ///
    /// Serves the JSON tool routes and the MCP Streamable HTTP endpoint at
    /// `/mcp`.
    Mcp,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "carc", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index {
            dry_run,
            json,
            progress,
        } => {
            let mode = ProgressMode::from_flag(&progress).ok_or_else(|| {
                anyhow::anyhow!(
                    "invalid --progress value '{}': expected auto, off, human, or json",
                    progress
                )
            })?;
            let archive = Archive::open(&cfg, mode.reporter().into()).await?;

            if dry_run {
                let plan = archive.coordinator.plan().await;
                let r = &plan.reconciliation;
                println!("index (dry-run)");
                println!("  total files: {}", plan.total_files);
                println!("  to add: {}", r.to_add.len());
                println!("  to update: {}", r.to_update.len());
                println!("  to delete: {}", r.to_delete.len());
                println!("  unchanged: {}", r.unchanged);
                for e in &plan.errors {
                    println!("  error: {}", e);
                }
            } else {
                let result = archive.coordinator.run().await;
                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    print!("{}", render::run_text(&result));
                }
            }
            archive.close().await;
        }
        Commands::Search {
            query,
            limit,
            project,
            format,
        } => {
            let archive = Archive::open(&cfg, ProgressMode::Off.reporter().into()).await?;
            let results = archive
                .query
                .search(&query, limit, project.as_deref())
                .await?;
            match format {
                OutputFormat::Text => print!("{}", render::search_text(&results)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
                OutputFormat::Markdown => println!("{}", render::search_markdown(&query, &results)),
            }
            archive.close().await;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve { service } => match service {
            ServeService::Mcp => {
                server::run_server(&cfg).await?;
            }
        },
        Commands::Completions { .. } => {}
    }

    Ok(())
}
