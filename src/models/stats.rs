//! Crawl run statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Article;

/// Counters collected over one crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Articles received from the source (before filtering)
    pub fetched: usize,
    /// Articles discarded because their fingerprint was already seen
    pub duplicates: usize,
    /// Articles added to the batch
    pub accepted: usize,
    /// Malformed articles (rejected by the source or missing a URL)
    pub errors: usize,
    /// Articles published before the retention cutoff, skipped unseen
    #[serde(default)]
    pub out_of_window: usize,
    /// Pages successfully fetched
    pub pages: usize,
    /// Retry attempts made after transient failures
    pub retries: usize,
    /// Fingerprints dropped by the retention policy
    pub pruned: usize,
    /// Query terms whose pagination finished
    pub terms_completed: usize,
    /// Run stopped early because the article budget was reached
    pub truncated: bool,
}

impl RunStats {
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            started_at: at,
            finished_at: at,
            fetched: 0,
            duplicates: 0,
            accepted: 0,
            errors: 0,
            out_of_window: 0,
            pages: 0,
            retries: 0,
            pruned: 0,
            terms_completed: 0,
            truncated: false,
        }
    }

    /// Wall-clock duration of the run in milliseconds.
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Accepted articles of one run plus its counters.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub articles: Vec<Article>,
    pub stats: RunStats,
}

impl BatchResult {
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}
