// src/export/tsv.rs

//! Processed-data export: a tab-separated table of cleaned articles plus a
//! JSON summary, both stamped with the same timestamp.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Local;

use super::{ExportReport, Exporter, file_timestamp};
use crate::error::Result;
use crate::models::{Article, RunStats};
use crate::pipeline::process::{ProcessedArticle, SummaryStats, process_articles};
use crate::utils::fs::{write_bytes_atomic, write_json_atomic};

/// Tabs and line breaks would split a field.
fn sanitize_field(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}

/// Render rows as TSV with a header line.
pub fn render_tsv(rows: &[ProcessedArticle]) -> String {
    let mut out = ProcessedArticle::COLUMNS.join("\t");
    out.push('\n');
    for row in rows {
        let fields: Vec<String> = row.fields().iter().map(|f| sanitize_field(f)).collect();
        out.push_str(&fields.join("\t"));
        out.push('\n');
    }
    out
}

/// Writes `stock_news_processed_{ts}.csv` and `summary_stats_{ts}.json`.
#[derive(Debug, Clone)]
pub struct TsvExporter {
    processed_dir: PathBuf,
}

impl TsvExporter {
    pub fn new(processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            processed_dir: processed_dir.into(),
        }
    }
}

#[async_trait]
impl Exporter for TsvExporter {
    fn name(&self) -> &'static str {
        "tsv"
    }

    async fn export(&self, articles: &[Article], _stats: &RunStats) -> Result<ExportReport> {
        let mut report = ExportReport::new(self.name());
        if articles.is_empty() {
            log::warn!("No articles found to process");
            return Ok(report);
        }

        let (rows, _removed) = process_articles(articles);
        let summary = SummaryStats::from_rows(&rows);
        let ts = file_timestamp(Local::now());

        let table_path = self
            .processed_dir
            .join(format!("stock_news_processed_{}.csv", ts));
        write_bytes_atomic(&table_path, render_tsv(&rows).as_bytes()).await?;
        log::info!("Saved processed data to {}", table_path.display());

        let stats_path = self.processed_dir.join(format!("summary_stats_{}.json", ts));
        write_json_atomic(&stats_path, &summary).await?;
        log::info!("Saved summary statistics to {}", stats_path.display());

        report.records = rows.len();
        report.files = vec![table_path, stats_path];
        Ok(report)
    }
}
