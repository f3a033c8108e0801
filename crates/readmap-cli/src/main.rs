use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use readmap_etl::{BackfillOptions, Config, RecordSource};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "readmap", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/readmap/readmap.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Load book records, insert them, and backfill embeddings
    ///
    /// Reads every record from the chosen source and validates it before
    /// anything is written, inserts all records in one transaction, then
    /// requests an embedding for each book that has a description and no
    /// embedding yet.
    ///
    /// CSV columns must be named after the book fields (isbn13, isbn10,
    /// title, subtitle, authors, categories, thumbnail, description,
    /// published_year, average_rating, num_pages, ratings_count). The
    /// authors and categories cells are `;`-separated lists.
    ///
    /// Requires a Google API key unless --skip-backfill is given.
    Seed {
        #[command(flatten)]
        input: SeedInput,

        /// Insert only; leave embeddings for a later `readmap backfill`
        #[arg(long)]
        skip_backfill: bool,

        /// Embed at most this many books in this run
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Embed every book that has a description but no embedding yet
    ///
    /// Safe to interrupt and re-run: books already embedded are never
    /// requested again, and books whose request failed are retried on the
    /// next run.
    Backfill {
        /// Embed at most this many books in this run
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show how many books are embedded, pending, or lack a description
    Status,
    /// Find the books whose descriptions are closest to a query
    Search {
        /// Free-text query
        query: String,

        /// Number of results to show
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Exactly one record source.
#[derive(Debug, clap::Args)]
#[group(required = true, multiple = false)]
struct SeedInput {
    /// Read records from a CSV file
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Read records from a JSON array file
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Use the built-in example record
    #[arg(long)]
    sample: bool,
}

impl SeedInput {
    fn into_source(self) -> RecordSource {
        match (self.csv, self.json) {
            (Some(path), _) => RecordSource::Csv(path),
            (None, Some(path)) => RecordSource::Json(path),
            (None, None) => RecordSource::Sample,
        }
    }
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print a single config value
    Get {
        /// Config key (e.g. embedding_model)
        key: String,
    },
    /// Set a value in the config file
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// Print the config file path
    Path,
    /// Create the config file with commented defaults
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Seed {
            input,
            skip_backfill,
            limit,
        } => {
            let config = load_config(cli.db)?;
            commands::run_seed(
                &config,
                input.into_source(),
                skip_backfill,
                BackfillOptions { limit },
            )
            .await?;
        }
        Commands::Backfill { limit } => {
            let config = load_config(cli.db)?;
            commands::run_backfill(&config, BackfillOptions { limit }).await?;
        }
        Commands::Status => {
            let config = load_config(cli.db)?;
            commands::show_status(&config)?;
        }
        Commands::Search { query, limit } => {
            let config = load_config(cli.db)?;
            commands::run_search(&config, &query, limit).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config()?,
            ConfigAction::Get { key } => commands::config::get_config(&key)?,
            ConfigAction::Set { key, value } => commands::config::set_config(&key, &value)?,
            ConfigAction::Path => commands::config::show_path()?,
            ConfigAction::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}

/// Load configuration, honouring `--db`, and make sure the database
/// directory exists.
fn load_config(db: Option<PathBuf>) -> Result<Config> {
    let config = match db {
        Some(db_path) => Config::load_with_db_path(db_path)?,
        None => Config::load()?,
    };

    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(config)
}
