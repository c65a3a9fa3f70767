//! Output stages fed by a committed crawl batch.
//!
//! - [`JsonBatchExporter`]: raw `stock_news_batch_*.json` files
//! - [`TsvExporter`]: cleaned tab-separated table plus summary statistics
//! - [`SqlExporter`]: PostgreSQL DDL and insert/upsert scripts

pub mod json;
pub mod sql;
pub mod tsv;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::error::Result;
use crate::models::{Article, RunStats};

pub use json::{JsonBatchExporter, list_batches, load_batches};
pub use sql::{SqlExporter, SqlGenerator, is_valid_identifier};
pub use tsv::TsvExporter;

/// Files written by one exporter.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub exporter: &'static str,
    pub files: Vec<PathBuf>,
    /// Articles written (after any deduplication the exporter applies)
    pub records: usize,
}

impl ExportReport {
    pub fn new(exporter: &'static str) -> Self {
        Self {
            exporter,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Sink for accepted articles.
///
/// Exporters run after the checkpoint commit; a failing exporter does not
/// roll the commit back.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    async fn export(&self, articles: &[Article], stats: &RunStats) -> Result<ExportReport>;
}

/// Timestamp used in output file names, `YYYYmmdd_HHMMSS` local time.
pub fn file_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}
