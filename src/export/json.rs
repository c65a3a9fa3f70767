// src/export/json.rs

//! Raw batch files.
//!
//! Each committed run writes its accepted articles to
//! `{data_dir}/stock_news_batch_{n}_{timestamp}.json`, where `n` counts up
//! from the batches already on disk. Downstream stages read every batch
//! back with [`load_batches`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;

use super::{ExportReport, Exporter, file_timestamp};
use crate::error::{AppError, Result};
use crate::models::{Article, RunStats};
use crate::utils::fs::write_json_atomic;

const BATCH_PREFIX: &str = "stock_news_batch_";
const BATCH_SUFFIX: &str = ".json";

fn is_batch_file(name: &str) -> bool {
    name.starts_with(BATCH_PREFIX) && name.ends_with(BATCH_SUFFIX)
}

/// Batch file name for batch number `n`.
pub fn batch_file_name(n: usize, timestamp: &str) -> String {
    format!("{}{}_{}{}", BATCH_PREFIX, n, timestamp, BATCH_SUFFIX)
}

/// All batch files in `dir`, sorted by file name. A missing directory has
/// no batches.
pub async fn list_batches(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut batches = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_batch = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_batch_file);
        if is_batch && path.is_file() {
            batches.push(path);
        }
    }
    batches.sort();
    Ok(batches)
}

/// A batch file holds a list of articles; single objects are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Many(Vec<Article>),
    One(Box<Article>),
}

/// Read every batch in `dir`. Files that fail to parse are logged and
/// skipped.
pub async fn load_batches(dir: &Path) -> Result<Vec<Article>> {
    let files = list_batches(dir).await?;
    log::info!("Found {} batch files in {}", files.len(), dir.display());

    let mut articles = Vec::new();
    for path in files {
        let parsed = tokio::fs::read(&path)
            .await
            .map_err(AppError::from)
            .and_then(|bytes| serde_json::from_slice::<BatchFile>(&bytes).map_err(AppError::from));

        match parsed {
            Ok(BatchFile::Many(batch)) => {
                log::debug!("Loaded {} articles from {}", batch.len(), path.display());
                articles.extend(batch);
            }
            Ok(BatchFile::One(article)) => articles.push(*article),
            Err(e) => log::warn!("Skipping unreadable batch {}: {}", path.display(), e),
        }
    }
    Ok(articles)
}

/// Writes each run's accepted articles to a new batch file.
#[derive(Debug, Clone)]
pub struct JsonBatchExporter {
    data_dir: PathBuf,
}

impl JsonBatchExporter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

#[async_trait]
impl Exporter for JsonBatchExporter {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn export(&self, articles: &[Article], stats: &RunStats) -> Result<ExportReport> {
        let mut report = ExportReport::new(self.name());
        if articles.is_empty() {
            log::info!("No new articles, skipping batch file");
            return Ok(report);
        }

        let n = list_batches(&self.data_dir).await?.len() + 1;
        let path = self
            .data_dir
            .join(batch_file_name(n, &file_timestamp(Local::now())));
        write_json_atomic(&path, articles).await?;

        log::info!(
            "Batch {}: saved {} new articles ({} duplicates skipped) to {}",
            n,
            articles.len(),
            stats.duplicates,
            path.display()
        );

        report.records = articles.len();
        report.files.push(path);
        Ok(report)
    }
}
