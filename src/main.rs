//! # Course TA CLI (`course-ta`)
//!
//! Builds the course knowledge index and answers questions against it,
//! from the terminal or over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! course-ta --config ./config/course-ta.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `course-ta init` | Create the SQLite database and schema |
//! | `course-ta index [FILES...]` | Rebuild the index from scraped JSON records |
//! | `course-ta ask "<question>"` | Answer one question and print sources |
//! | `course-ta stats` | Show the index model, build time, and document counts |
//! | `course-ta serve` | Start the HTTP query endpoint |
//!
//! Logs go to stderr; set `RUST_LOG` (default `info`) to change verbosity.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use course_ta::progress::ProgressMode;
use course_ta::services::Services;
use course_ta::{ask, config, ingest, migrate, server, stats};

/// Course TA: a retrieval-grounded teaching assistant.
#[derive(Parser)]
#[command(
    name = "course-ta",
    about = "Course TA: index course material and answer questions with cited sources",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/course-ta.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Rebuild the index from JSON record files.
    ///
    /// Each file holds an array of records or a single record object.
    /// The previous index generation is discarded first.
    Index {
        /// Record files. Defaults to `[index].sources`.
        files: Vec<PathBuf>,

        /// Index name. Defaults to `[index].name`.
        #[arg(long)]
        name: Option<String>,

        /// Count records that would be indexed, without embedding or writing.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Answer one question.
    Ask {
        question: String,

        /// Print the retrieved context before the answer.
        #[arg(long)]
        show_context: bool,
    },

    /// Show index statistics.
    Stats,

    /// Start the HTTP query endpoint on `[server].bind`.
    Serve,
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Index {
            files,
            name,
            dry_run,
            progress,
        } => {
            let services = Services::from_config(&cfg).await?;
            let reporter = progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();
            let result =
                ingest::run_index(&services, &files, name.as_deref(), dry_run, reporter.as_ref())
                    .await;
            services.shutdown().await;
            result?;
        }
        Commands::Ask {
            question,
            show_context,
        } => {
            let services = Services::from_config(&cfg).await?;
            let result = ask::run_ask(&services, &question, show_context).await;
            services.shutdown().await;
            result?;
        }
        Commands::Serve => {
            let services = Arc::new(Services::from_config(&cfg).await?);
            let result = server::run_server(services.clone()).await;
            services.shutdown().await;
            result?;
        }
    }

    Ok(())
}
