//! Stock News CLI
//!
//! Local entry point for the crawl, process and SQL stages.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use stock_news::{
    error::{AppError, Result},
    export::list_batches,
    models::Config,
    pipeline,
    services::{FetchClient, NewsApiClient},
    storage::{CheckpointStore, JsonCheckpointStore},
};

/// Incremental stock news crawler
#[derive(Parser, Debug)]
#[command(
    name = "stock-news",
    version,
    about = "Incremental stock news crawler with CSV and SQL export"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check API credentials and output directories
    Health,

    /// Fetch new articles and write them as a raw batch
    Crawl,

    /// Clean all raw batches into a TSV table and summary
    Process,

    /// Generate PostgreSQL scripts from all raw batches
    Sql,

    /// Run full pipeline: Health → Crawl → Process → SQL
    Pipeline,

    /// Validate the configuration file
    Validate,

    /// Show checkpoint and batch info
    Info,

    /// Manage the crawl checkpoint
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },
}

#[derive(Subcommand, Debug)]
enum CheckpointAction {
    /// Move the checkpoint aside so the next crawl starts fresh
    Reset,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn news_client(config: &Config) -> Result<Arc<dyn FetchClient>> {
    Ok(Arc::new(NewsApiClient::new(&config.api)?))
}

fn checkpoint_store(config: &Config) -> Arc<JsonCheckpointStore> {
    Arc::new(JsonCheckpointStore::new(config.paths.checkpoint_path()))
}

async fn show_info(config: &Config, store: &JsonCheckpointStore) -> Result<()> {
    log::info!("Checkpoint: {}", store.location());
    if !tokio::fs::try_exists(store.path()).await? {
        log::info!("No checkpoint found yet.");
    } else {
        match store.load().await {
            Ok(state) => {
                log::info!("Known articles: {}", state.len());
                if let Some(window) = &state.last_window {
                    log::info!("Last window: {}", window.label());
                }
                if let Some(last_run) = &state.last_run {
                    log::info!("Last run: {}", last_run.to_rfc3339());
                }
                for (term, cursor) in &state.cursors {
                    log::info!(
                        "  '{}': next page {}{}",
                        term,
                        cursor.next_page,
                        if cursor.exhausted { " (exhausted)" } else { "" }
                    );
                }
            }
            Err(e) => {
                log::error!("{}", e);
                log::error!("Run 'stock-news checkpoint reset' to start fresh.");
            }
        }
    }

    let batches = list_batches(Path::new(&config.paths.data_dir)).await?;
    log::info!("Raw batches in {}: {}", config.paths.data_dir, batches.len());
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load_validated(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    log::info!("Stock news crawler starting...");

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
    };

    if cli.config.exists() {
        log::info!("Loaded configuration from {}", cli.config.display());
    } else {
        log::warn!(
            "Config file {} not found, using defaults",
            cli.config.display()
        );
    }

    let store = checkpoint_store(&config);

    match cli.command {
        Command::Health => {
            let client = news_client(&config)?;
            pipeline::run_health(&config, client.as_ref()).await?;
        }

        Command::Crawl => {
            let client = news_client(&config)?;
            let (batch, report) = pipeline::run_crawl(&config, client, store).await?;
            if let Some(path) = report.files.first() {
                log::info!(
                    "Saved {} articles to {}",
                    batch.articles.len(),
                    path.display()
                );
            }
        }

        Command::Process => {
            pipeline::run_process(&config, &pipeline::standalone_stats()).await?;
        }

        Command::Sql => {
            pipeline::run_sql(&config, &pipeline::standalone_stats()).await?;
        }

        Command::Pipeline => {
            let client = news_client(&config)?;
            let report = pipeline::run_pipeline(&config, client, store).await?;
            log::info!("Files created:");
            for path in report.files() {
                log::info!("  - {}", path.display());
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if config.api.api_key.trim().is_empty() {
                return Err(AppError::config(
                    "api.api_key is empty (set it in the config or NEWS_API_KEY)",
                ));
            }
            log::info!(
                "✓ Config OK ({} query terms, budget {}, {} days back)",
                config.crawl.query_terms.len(),
                config.crawl.max_total_articles,
                config.crawl.days_back
            );
        }

        Command::Info => {
            show_info(&config, &store).await?;
        }

        Command::Checkpoint {
            action: CheckpointAction::Reset,
        } => {
            store.reset().await?;
            log::info!("Checkpoint reset; the next crawl starts fresh.");
        }
    }

    log::info!("Done!");

    Ok(())
}
