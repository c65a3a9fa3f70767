// src/pipeline/pipeline.rs

//! Stage entry points and the end-to-end pipeline.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::export::{
    ExportReport, Exporter, JsonBatchExporter, SqlExporter, SqlGenerator, TsvExporter,
    load_batches,
};
use crate::models::{BatchResult, Config, RunStats};
use crate::services::FetchClient;
use crate::storage::CheckpointStore;
use crate::utils::log;

use super::crawl::{CrawlSettings, IncrementalCrawler};

const TOTAL_STEPS: usize = 4;

/// Outcome of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub stats: RunStats,
    pub exports: Vec<ExportReport>,
}

impl PipelineReport {
    /// Every file written, in stage order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.exports
            .iter()
            .flat_map(|r| r.files.iter().map(|p| p.as_path()))
    }
}

/// Check output directories and source reachability.
pub async fn run_health(config: &Config, client: &dyn FetchClient) -> Result<()> {
    for dir in [
        &config.paths.data_dir,
        &config.paths.processed_dir,
        &config.paths.sql_dir,
    ] {
        tokio::fs::create_dir_all(dir).await?;
        log::debug!("Directory ready: {}", dir);
    }

    client.health_check().await?;
    log::success("News API reachable and credentials accepted");
    Ok(())
}

/// Crawl once and write the accepted articles as a new raw batch.
pub async fn run_crawl(
    config: &Config,
    client: Arc<dyn FetchClient>,
    store: Arc<dyn CheckpointStore>,
) -> Result<(BatchResult, ExportReport)> {
    log::header("Crawling stock news");
    log::sub_item(&format!("Checkpoint: {}", store.location()));

    let mut crawler = IncrementalCrawler::new(CrawlSettings::from_config(config), client, store);
    let batch = crawler.run().await?;

    let report = JsonBatchExporter::new(&config.paths.data_dir)
        .export(&batch.articles, &batch.stats)
        .await?;

    let stats = &batch.stats;
    log::summary(
        "Crawl",
        &[
            ("fetched", stats.fetched.to_string()),
            ("duplicates", stats.duplicates.to_string()),
            ("accepted", stats.accepted.to_string()),
            ("errors", stats.errors.to_string()),
            ("out of window", stats.out_of_window.to_string()),
            ("pages", stats.pages.to_string()),
            ("pruned", stats.pruned.to_string()),
            ("truncated", stats.truncated.to_string()),
            ("elapsed", format!("{} ms", stats.elapsed_ms())),
        ],
    );

    Ok((batch, report))
}

/// Clean every raw batch into the processed table and summary.
pub async fn run_process(config: &Config, stats: &RunStats) -> Result<ExportReport> {
    log::header("Processing raw batches");
    let articles = load_batches(Path::new(&config.paths.data_dir)).await?;
    let report = TsvExporter::new(&config.paths.processed_dir)
        .export(&articles, stats)
        .await?;
    log::success(&format!("Processed {} articles", report.records));
    Ok(report)
}

/// Generate SQL scripts for every raw batch.
pub async fn run_sql(config: &Config, stats: &RunStats) -> Result<ExportReport> {
    log::header("Generating SQL");
    let generator = SqlGenerator::new(&config.sql.table_name)?;
    let articles = load_batches(Path::new(&config.paths.data_dir)).await?;
    let report = SqlExporter::new(&config.paths.sql_dir, generator)
        .export(&articles, stats)
        .await?;
    log::success(&format!("Generated SQL for {} articles", report.records));
    Ok(report)
}

/// Run the full pipeline: health, crawl, process, SQL.
///
/// Processing is skipped when the crawl accepted nothing; SQL generation
/// always runs over the batches on disk.
pub async fn run_pipeline(
    config: &Config,
    client: Arc<dyn FetchClient>,
    store: Arc<dyn CheckpointStore>,
) -> Result<PipelineReport> {
    log::header("Stock news pipeline");

    log::step(1, TOTAL_STEPS, "Health check");
    run_health(config, client.as_ref()).await?;

    log::step(2, TOTAL_STEPS, "Crawl");
    let (batch, raw) = run_crawl(config, client, store).await?;
    let mut exports = vec![raw];

    log::step(3, TOTAL_STEPS, "Process");
    if batch.is_empty() {
        log::info!("No new articles in this run, skipping processing");
    } else {
        exports.push(run_process(config, &batch.stats).await?);
    }

    log::step(4, TOTAL_STEPS, "SQL");
    exports.push(run_sql(config, &batch.stats).await?);

    log::separator();
    log::success("Pipeline complete");
    Ok(PipelineReport {
        stats: batch.stats,
        exports,
    })
}

/// Stats placeholder for stages run outside a crawl.
pub fn standalone_stats() -> RunStats {
    RunStats::started(Utc::now())
}
