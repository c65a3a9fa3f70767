// src/export/sql.rs

//! PostgreSQL script generation.
//!
//! Rows are keyed on `url`, so re-running the insert script is harmless
//! (`ON CONFLICT DO NOTHING`) and the upsert script refreshes existing rows.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Local;
use regex::Regex;

use super::{ExportReport, Exporter, file_timestamp};
use crate::error::{AppError, Result};
use crate::models::{Article, RunStats};
use crate::pipeline::process::{ProcessedArticle, process_articles};
use crate::utils::fs::write_bytes_atomic;

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Columns written by insert and upsert, in order.
const COLUMNS: [&str; 12] = [
    "url",
    "title",
    "description",
    "source",
    "author",
    "published_at",
    "scraped_at",
    "image_url",
    "domain",
    "word_count",
    "has_image",
    "has_author",
];

/// Whether `name` can be spliced into SQL as an unquoted identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    Regex::new(IDENTIFIER_PATTERN).is_ok_and(|re| re.is_match(name))
}

/// Literal for a text column; empty becomes `NULL`.
fn text(value: &str) -> String {
    if value.is_empty() {
        "NULL".to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

fn boolean(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

fn row_values(row: &ProcessedArticle) -> String {
    let values = [
        text(&row.url),
        text(&row.title),
        text(&row.description),
        text(&row.source),
        text(&row.author),
        text(&row.published_at),
        text(&row.scraped_at),
        text(&row.image_url),
        text(&row.domain),
        row.word_count.to_string(),
        boolean(row.has_image).to_string(),
        boolean(row.has_author).to_string(),
    ];
    format!("({})", values.join(", "))
}

/// Generates DDL and DML for one table.
#[derive(Debug, Clone)]
pub struct SqlGenerator {
    table: String,
}

impl SqlGenerator {
    pub fn new(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_valid_identifier(&table) {
            return Err(AppError::config(format!(
                "invalid SQL table name: {}",
                table
            )));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn create_table_sql(&self) -> String {
        let t = &self.table;
        format!(
            "CREATE TABLE IF NOT EXISTS {t} (
    id SERIAL PRIMARY KEY,
    url TEXT UNIQUE NOT NULL,
    title TEXT,
    description TEXT,
    source VARCHAR(255),
    author VARCHAR(255),
    published_at TIMESTAMP,
    scraped_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    image_url TEXT,
    domain VARCHAR(255),
    word_count INTEGER DEFAULT 0,
    has_image BOOLEAN DEFAULT FALSE,
    has_author BOOLEAN DEFAULT FALSE,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_{t}_url ON {t}(url);
CREATE INDEX IF NOT EXISTS idx_{t}_source ON {t}(source);
CREATE INDEX IF NOT EXISTS idx_{t}_published_at ON {t}(published_at);
CREATE INDEX IF NOT EXISTS idx_{t}_domain ON {t}(domain);
"
        )
    }

    fn insert_head(&self, rows: &[ProcessedArticle]) -> String {
        let values: Vec<String> = rows.iter().map(row_values).collect();
        format!(
            "INSERT INTO {} ({}) VALUES\n{}",
            self.table,
            COLUMNS.join(", "),
            values.join(",\n")
        )
    }

    /// Insert skipping URLs already present. Empty for no rows.
    pub fn insert_sql(&self, rows: &[ProcessedArticle]) -> String {
        if rows.is_empty() {
            return String::new();
        }
        format!("{}\nON CONFLICT (url) DO NOTHING;", self.insert_head(rows))
    }

    /// Insert refreshing every column of existing URLs. Empty for no rows.
    pub fn upsert_sql(&self, rows: &[ProcessedArticle]) -> String {
        if rows.is_empty() {
            return String::new();
        }
        let updates: Vec<String> = COLUMNS
            .iter()
            .filter(|c| **c != "url")
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();
        format!(
            "{}\nON CONFLICT (url) DO UPDATE SET {}, updated_at = CURRENT_TIMESTAMP;",
            self.insert_head(rows),
            updates.join(", ")
        )
    }
}

/// Writes the create, insert, upsert and combined scripts to `sql_dir`.
#[derive(Debug, Clone)]
pub struct SqlExporter {
    sql_dir: PathBuf,
    generator: SqlGenerator,
}

impl SqlExporter {
    pub fn new(sql_dir: impl Into<PathBuf>, generator: SqlGenerator) -> Self {
        Self {
            sql_dir: sql_dir.into(),
            generator,
        }
    }

    async fn write(&self, name: String, content: &str) -> Result<PathBuf> {
        let path = self.sql_dir.join(name);
        write_bytes_atomic(&path, content.as_bytes())
            .await
            .map_err(|e| AppError::export(format!("writing {}", path.display()), e))?;
        log::info!("Saved SQL to {}", path.display());
        Ok(path)
    }
}

#[async_trait]
impl Exporter for SqlExporter {
    fn name(&self) -> &'static str {
        "sql"
    }

    async fn export(&self, articles: &[Article], _stats: &RunStats) -> Result<ExportReport> {
        let mut report = ExportReport::new(self.name());
        if articles.is_empty() {
            log::warn!("No articles found for SQL generation");
            return Ok(report);
        }

        // One statement cannot touch the same url twice
        let (rows, _) = process_articles(articles);
        let now = Local::now();
        let ts = file_timestamp(now);

        let create = self.generator.create_table_sql();
        let insert = self.generator.insert_sql(&rows);
        let upsert = self.generator.upsert_sql(&rows);
        let complete = format!(
            "-- Complete SQL script for {}\n-- Generated on {}\n\n{}\n-- Insert new articles only (skip duplicates)\n{}\n",
            self.generator.table(),
            now.format("%Y-%m-%d %H:%M:%S"),
            create,
            insert
        );

        report.files = vec![
            self.write(format!("create_table_{}.sql", ts), &create).await?,
            self.write(format!("insert_articles_{}.sql", ts), &insert).await?,
            self.write(format!("upsert_articles_{}.sql", ts), &upsert).await?,
            self.write(format!("complete_sql_{}.sql", ts), &complete).await?,
        ];
        report.records = rows.len();
        Ok(report)
    }
}
