//! Pipeline stages.
//!
//! - `crawl`: checkpointed incremental crawler
//! - `fingerprint`: article identity
//! - `retry`: backoff for transient fetch failures
//! - `process`: normalization and summary statistics
//! - `pipeline`: stage entry points (`run_crawl`, `run_process`, `run_sql`, `run_pipeline`)

pub mod crawl;
pub mod fingerprint;
#[allow(clippy::module_inception)]
pub mod pipeline;
pub mod process;
pub mod retry;

pub use crawl::{CrawlSettings, CrawlState, IncrementalCrawler};
pub use fingerprint::{Fingerprinter, fingerprint, normalize_url};
pub use pipeline::{
    PipelineReport, run_crawl, run_health, run_pipeline, run_process, run_sql, standalone_stats,
};
pub use retry::{BackoffPolicy, retry_transient};
