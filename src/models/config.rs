//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::export::sql::is_valid_identifier;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// News API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Incremental crawl behavior
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Retry policy for transient fetch failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Output and state locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// SQL generation settings
    #[serde(default)]
    pub sql: SqlConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse configuration from a TOML file without validating it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| AppError::config(format!("{}: {}", path.display(), e)))
    }

    /// Load, apply environment overrides and validate.
    ///
    /// A missing file falls back to defaults; a file that exists but does
    /// not parse, or values that fail validation, are rejected.
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            log::warn!("Config file {:?} not found. Using defaults.", path);
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override selected values from environment variables.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("NEWS_API_KEY") {
            if !key.trim().is_empty() {
                self.api.api_key = key.trim().to_string();
            }
        }

        if let Ok(terms) = std::env::var("NEWS_QUERY_TERMS") {
            let terms: Vec<String> = terms
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if !terms.is_empty() {
                self.crawl.query_terms = terms;
            }
        }

        if let Ok(max) = std::env::var("NEWS_MAX_TOTAL_ARTICLES") {
            if let Ok(n) = max.parse() {
                self.crawl.max_total_articles = n;
            }
        }

        if let Ok(days) = std::env::var("NEWS_DAYS_BACK") {
            if let Ok(n) = days.parse() {
                self.crawl.days_back = n;
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawl.query_terms.is_empty() {
            return Err(AppError::config("crawl.query_terms is empty"));
        }
        if self.crawl.query_terms.iter().any(|t| t.trim().is_empty()) {
            return Err(AppError::config("crawl.query_terms contains a blank term"));
        }
        if self.crawl.batch_size == 0 {
            return Err(AppError::config("crawl.batch_size must be > 0"));
        }
        if self.crawl.max_total_articles == 0 {
            return Err(AppError::config("crawl.max_total_articles must be > 0"));
        }
        if self.crawl.max_pages_per_term == 0 {
            return Err(AppError::config("crawl.max_pages_per_term must be > 0"));
        }
        if self.crawl.max_concurrent == 0 {
            return Err(AppError::config("crawl.max_concurrent must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::config("retry.max_attempts must be > 0"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::config("api.timeout_secs must be > 0"));
        }
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::config("api.user_agent is empty"));
        }
        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(AppError::config(format!(
                "api.base_url is not a valid URL: {}",
                self.api.base_url
            )));
        }
        if !is_valid_identifier(&self.sql.table_name) {
            return Err(AppError::config(format!(
                "sql.table_name is not a valid identifier: {}",
                self.sql.table_name
            )));
        }
        Ok(())
    }
}

/// News API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Endpoint for article search
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// API key (prefer the `NEWS_API_KEY` environment variable)
    #[serde(default)]
    pub api_key: String,

    /// Article language filter
    #[serde(default = "defaults::language")]
    pub language: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between page requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            api_key: String::new(),
            language: defaults::language(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// How an article's identity is derived.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintMode {
    /// Normalized URL only
    #[default]
    Url,
    /// Normalized URL plus publication timestamp
    UrlAndPublished,
}

/// Incremental crawl behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Search queries, crawled in order
    #[serde(default = "defaults::query_terms")]
    pub query_terms: Vec<String>,

    /// Articles requested per page
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Global cap on accepted articles per run
    #[serde(default = "defaults::max_total_articles")]
    pub max_total_articles: usize,

    /// Size of the query window in days
    #[serde(default = "defaults::days_back")]
    pub days_back: u32,

    /// Upper bound on pages requested per query term
    #[serde(default = "defaults::max_pages_per_term")]
    pub max_pages_per_term: u32,

    /// Query terms fetched concurrently
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Identity used for deduplication
    #[serde(default)]
    pub fingerprint_mode: FingerprintMode,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            query_terms: defaults::query_terms(),
            batch_size: defaults::batch_size(),
            max_total_articles: defaults::max_total_articles(),
            days_back: defaults::days_back(),
            max_pages_per_term: defaults::max_pages_per_term(),
            max_concurrent: defaults::max_concurrent(),
            fingerprint_mode: FingerprintMode::default(),
        }
    }
}

/// Retry policy for transient fetch failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per page, including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "defaults::base_delay")]
    pub base_delay_ms: u64,

    /// Cap on the backoff delay in milliseconds
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay(),
            max_delay_ms: defaults::max_delay(),
        }
    }
}

/// Output and state locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw batch files and the checkpoint live here
    #[serde(default = "defaults::data_dir")]
    pub data_dir: String,

    /// Checkpoint file name inside `data_dir`
    #[serde(default = "defaults::checkpoint_file")]
    pub checkpoint_file: String,

    /// Processed TSV and summary statistics
    #[serde(default = "defaults::processed_dir")]
    pub processed_dir: String,

    /// Generated SQL scripts
    #[serde(default = "defaults::sql_dir")]
    pub sql_dir: String,
}

impl PathsConfig {
    pub fn checkpoint_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.checkpoint_file)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            checkpoint_file: defaults::checkpoint_file(),
            processed_dir: defaults::processed_dir(),
            sql_dir: defaults::sql_dir(),
        }
    }
}

/// SQL generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlConfig {
    #[serde(default = "defaults::table_name")]
    pub table_name: String,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            table_name: defaults::table_name(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Print per-step detail lines
    #[serde(default = "defaults::show_progress")]
    pub show_progress: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            show_progress: defaults::show_progress(),
        }
    }
}

mod defaults {
    // API defaults
    pub fn base_url() -> String {
        "https://newsapi.org/v2/everything".into()
    }
    pub fn language() -> String {
        "en".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; stock-news/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        2000
    }

    // Crawl defaults
    pub fn query_terms() -> Vec<String> {
        vec![
            "stock market".into(),
            "stock market news".into(),
            "financial news".into(),
            "investment news".into(),
            "market analysis".into(),
            "economic news".into(),
            "trading news".into(),
            "business news".into(),
        ]
    }
    pub fn batch_size() -> usize {
        20
    }
    pub fn max_total_articles() -> usize {
        1000
    }
    pub fn days_back() -> u32 {
        7
    }
    pub fn max_pages_per_term() -> u32 {
        5
    }
    pub fn max_concurrent() -> usize {
        1
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn base_delay() -> u64 {
        500
    }
    pub fn max_delay() -> u64 {
        10_000
    }

    // Path defaults
    pub fn data_dir() -> String {
        "data".into()
    }
    pub fn checkpoint_file() -> String {
        "checkpoint.json".into()
    }
    pub fn processed_dir() -> String {
        "processed_data".into()
    }
    pub fn sql_dir() -> String {
        "sql".into()
    }

    pub fn table_name() -> String {
        "stock_articles".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
    pub fn show_progress() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.crawl.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(AppError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_query_terms() {
        let mut config = Config::default();
        config.crawl.query_terms.clear();
        assert!(config.validate().is_err());

        config.crawl.query_terms = vec!["finance".into(), "  ".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_budget() {
        let mut config = Config::default();
        config.crawl.max_total_articles = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_table_name() {
        let mut config = Config::default();
        config.sql.table_name = "articles; DROP TABLE x".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_partial_toml_uses_defaults() {
        let toml = r#"
            [crawl]
            query_terms = ["finance"]
            batch_size = 10
            max_total_articles = 20
            days_back = 7

            [crawl_extras_from_a_newer_build]
            ignored = true
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.crawl.query_terms, vec!["finance".to_string()]);
        assert_eq!(config.crawl.batch_size, 10);
        assert_eq!(config.crawl.max_pages_per_term, 5);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.api.language, "en");
        assert_eq!(config.crawl.fingerprint_mode, FingerprintMode::Url);
    }

    #[test]
    fn negative_batch_size_fails_fast() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[crawl]\nbatch_size = -5\n").unwrap();

        assert!(matches!(
            Config::load_validated(&path),
            Err(AppError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_validated(tmp.path().join("nope.toml")).unwrap();
        assert_eq!(config.crawl.batch_size, 20);
    }

    #[test]
    fn checkpoint_path_joins_data_dir() {
        let paths = PathsConfig::default();
        assert_eq!(
            paths.checkpoint_path(),
            Path::new("data").join("checkpoint.json")
        );
    }
}
