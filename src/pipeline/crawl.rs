// src/pipeline/crawl.rs

//! Checkpointed incremental crawl.
//!
//! One run loads the committed [`CheckpointState`], pages through every
//! query term, filters articles by fingerprint against a working copy of
//! that state and commits the working copy exactly once at the end.
//! Failed runs never touch the committed state, so reruns resume from the
//! last successful commit. `Failed` is terminal for a crawler instance;
//! retrying takes a new [`IncrementalCrawler`].
//!
//! ```text
//! Idle -> Fetching -> Filtering -> Accumulating -> Committing -> Idle
//!            |                                         |
//!            +------------------> Failed <-------------+
//! ```
//!
//! Query terms may be fetched concurrently, but every page funnels into the
//! single consumer loop in [`IncrementalCrawler::run`], which is the only
//! place fingerprints are tested and inserted.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{
    Article, BatchResult, CheckpointState, Config, DateRange, FingerprintMode, QueryCursor,
    RunStats,
};
use crate::pipeline::fingerprint::Fingerprinter;
use crate::pipeline::retry::{BackoffPolicy, Retried, retry_transient};
use crate::services::{FetchClient, FetchedPage, PageRequest};
use crate::storage::CheckpointStore;

/// Crawler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    Fetching,
    Filtering,
    Accumulating,
    Committing,
    Failed,
}

/// Settings consumed by the crawler, taken from [`Config`] at construction.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub query_terms: Vec<String>,
    pub batch_size: usize,
    pub max_total_articles: usize,
    pub days_back: u32,
    pub max_pages_per_term: u32,
    pub max_concurrent: usize,
    pub fingerprint_mode: FingerprintMode,
    pub backoff: BackoffPolicy,
    pub request_delay: Duration,
    /// Per-page progress at info level instead of debug
    pub show_progress: bool,
    /// Fixed "today" for the query window; defaults to the current UTC date
    pub today: Option<NaiveDate>,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            query_terms: config.crawl.query_terms.clone(),
            batch_size: config.crawl.batch_size,
            max_total_articles: config.crawl.max_total_articles,
            days_back: config.crawl.days_back,
            max_pages_per_term: config.crawl.max_pages_per_term,
            max_concurrent: config.crawl.max_concurrent,
            fingerprint_mode: config.crawl.fingerprint_mode,
            backoff: BackoffPolicy::from(&config.retry),
            request_delay: Duration::from_millis(config.api.request_delay_ms),
            show_progress: config.logging.show_progress,
            today: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.query_terms.is_empty() || self.query_terms.iter().any(|t| t.trim().is_empty()) {
            return Err(AppError::config("query terms must be non-empty strings"));
        }
        if self.batch_size == 0 {
            return Err(AppError::config("batch_size must be > 0"));
        }
        if self.max_total_articles == 0 {
            return Err(AppError::config("max_total_articles must be > 0"));
        }
        if self.max_pages_per_term == 0 {
            return Err(AppError::config("max_pages_per_term must be > 0"));
        }
        Ok(())
    }

    fn window(&self) -> DateRange {
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        DateRange::ending(today, self.days_back)
    }
}

/// Fingerprints of articles published before this instant are pruned, and
/// articles published before it are never accepted, so a pruned
/// fingerprint cannot come back as new.
///
/// One day of slack before the window start covers timezone skew between
/// the API's date filter and article timestamps.
fn retention_cutoff(window: &DateRange) -> DateTime<Utc> {
    let day = window
        .from
        .checked_sub_days(Days::new(1))
        .unwrap_or(window.from);
    Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN))
}

/// Shared, read-only inputs of every term walk.
struct WalkContext {
    client: Arc<dyn FetchClient>,
    window: DateRange,
    page_size: usize,
    max_pages: u32,
    backoff: BackoffPolicy,
    request_delay: Duration,
}

/// Pagination progress of one query term within a run.
struct TermWalk {
    term: String,
    next: Option<u32>,
    pages_fetched: u32,
    finished: bool,
}

/// What a term walk reports to the consumer loop.
enum TermEvent {
    Page {
        term: String,
        page: u32,
        fetched: FetchedPage,
        retries: u32,
    },
    Done {
        term: String,
        cursor: QueryCursor,
    },
    Failed {
        term: String,
        page: u32,
        error: AppError,
        retries: u32,
    },
}

impl TermWalk {
    fn into_stream(self, ctx: Arc<WalkContext>) -> BoxStream<'static, TermEvent> {
        stream::unfold(self, move |mut walk| {
            let ctx = Arc::clone(&ctx);
            async move {
                if walk.finished {
                    return None;
                }

                let Some(page) = walk.next else {
                    walk.finished = true;
                    let event = TermEvent::Done {
                        term: walk.term.clone(),
                        cursor: QueryCursor {
                            window: ctx.window,
                            next_page: 1,
                            exhausted: true,
                        },
                    };
                    return Some((event, walk));
                };

                if walk.pages_fetched >= ctx.max_pages {
                    walk.finished = true;
                    let event = TermEvent::Done {
                        term: walk.term.clone(),
                        cursor: QueryCursor {
                            window: ctx.window,
                            next_page: page,
                            exhausted: false,
                        },
                    };
                    return Some((event, walk));
                }

                if walk.pages_fetched > 0 && !ctx.request_delay.is_zero() {
                    tokio::time::sleep(ctx.request_delay).await;
                }

                let request = PageRequest {
                    query: walk.term.clone(),
                    page,
                    page_size: ctx.page_size,
                    window: ctx.window,
                };
                let label = format!("'{}' page {}", walk.term, page);
                let Retried { result, retries } =
                    retry_transient(&ctx.backoff, &label, || ctx.client.fetch(&request)).await;
                walk.pages_fetched += 1;

                let event = match result {
                    Ok(fetched) => {
                        walk.next = if older_than_window(&fetched.articles, &ctx.window) {
                            log::debug!("{}: past the window start, stopping term", label);
                            None
                        } else {
                            fetched.next_page
                        };
                        TermEvent::Page {
                            term: walk.term.clone(),
                            page,
                            fetched,
                            retries,
                        }
                    }
                    Err(error) => {
                        walk.finished = true;
                        TermEvent::Failed {
                            term: walk.term.clone(),
                            page,
                            error,
                            retries,
                        }
                    }
                };
                Some((event, walk))
            }
        })
        .boxed()
    }
}

/// A non-empty page whose every article predates the window.
fn older_than_window(articles: &[Article], window: &DateRange) -> bool {
    !articles.is_empty()
        && articles
            .iter()
            .all(|a| a.published_at.date_naive() < window.from)
}

/// Incremental crawler with checkpointed deduplication.
pub struct IncrementalCrawler {
    settings: CrawlSettings,
    client: Arc<dyn FetchClient>,
    store: Arc<dyn CheckpointStore>,
    fingerprinter: Fingerprinter,
    state: CrawlState,
}

impl IncrementalCrawler {
    pub fn new(
        settings: CrawlSettings,
        client: Arc<dyn FetchClient>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        let fingerprinter = Fingerprinter::new(settings.fingerprint_mode);
        Self {
            settings,
            client,
            store,
            fingerprinter,
            state: CrawlState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CrawlState {
        self.state
    }

    fn transition(&mut self, next: CrawlState) {
        if self.state != next {
            log::debug!("crawler: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn fail(&mut self, error: AppError) -> AppError {
        self.transition(CrawlState::Failed);
        log::error!("Crawl failed, checkpoint left unchanged: {}", error);
        error
    }

    /// Run one crawl and commit the checkpoint on success.
    pub async fn run(&mut self) -> Result<BatchResult> {
        if self.state == CrawlState::Failed {
            return Err(AppError::CrawlerFailed);
        }
        self.settings.validate()?;

        let mut stats = RunStats::started(Utc::now());
        let loaded = self.store.load().await;
        let mut working: CheckpointState = match loaded {
            Ok(state) => state,
            Err(e) => return Err(self.fail(e)),
        };

        let window = self.settings.window();
        let cutoff = retention_cutoff(&window);
        stats.pruned = working.prune_before(cutoff);
        if stats.pruned > 0 {
            log::info!("Pruned {} fingerprints older than the window", stats.pruned);
        }

        let budget = self.settings.max_total_articles;
        log::info!(
            "Starting crawl of {} terms over {} with {} known articles (budget {})",
            self.settings.query_terms.len(),
            window.label(),
            working.len(),
            budget
        );

        let ctx = Arc::new(WalkContext {
            client: Arc::clone(&self.client),
            window,
            page_size: self.settings.batch_size,
            max_pages: self.settings.max_pages_per_term,
            backoff: self.settings.backoff,
            request_delay: self.settings.request_delay,
        });

        let walks: Vec<TermWalk> = self
            .settings
            .query_terms
            .iter()
            .map(|term| {
                let start = match working.cursor(term) {
                    Some(c) if c.window == window && !c.exhausted => c.next_page.max(1),
                    _ => 1,
                };
                if start > 1 {
                    log::info!("Resuming '{}' at page {}", term, start);
                }
                TermWalk {
                    term: term.clone(),
                    next: Some(start),
                    pages_fetched: 0,
                    finished: false,
                }
            })
            .collect();

        let concurrency = self.settings.max_concurrent.max(1);
        let mut events = stream::iter(walks)
            .map(move |walk| walk.into_stream(Arc::clone(&ctx)))
            .flatten_unordered(concurrency)
            .boxed();

        let mut accepted: Vec<Article> = Vec::new();

        self.transition(CrawlState::Fetching);
        while let Some(event) = events.next().await {
            match event {
                TermEvent::Page {
                    term,
                    page,
                    fetched,
                    retries,
                } => {
                    stats.pages += 1;
                    stats.retries += retries as usize;
                    stats.errors += fetched.rejected;
                    stats.fetched += fetched.articles.len() + fetched.rejected;

                    self.transition(CrawlState::Filtering);
                    let mut page_new = 0;
                    let mut consumed_page = true;
                    for article in fetched.articles {
                        if accepted.len() >= budget {
                            consumed_page = false;
                            break;
                        }

                        if article.url.trim().is_empty() {
                            stats.errors += 1;
                            continue;
                        }

                        if article.published_at < cutoff {
                            stats.out_of_window += 1;
                            continue;
                        }

                        let fp = self.fingerprinter.fingerprint(&article);
                        if working.contains(&fp) {
                            stats.duplicates += 1;
                            continue;
                        }

                        self.transition(CrawlState::Accumulating);
                        log::trace!(
                            "Accepted {}",
                            article.format("[{source}] {title} ({published})")
                        );
                        working.insert(fp, article.published_at);
                        accepted.push(article);
                        page_new += 1;
                        self.transition(CrawlState::Filtering);
                    }

                    let level = if self.settings.show_progress {
                        log::Level::Info
                    } else {
                        log::Level::Debug
                    };
                    log::log!(
                        level,
                        "'{}' page {}: {} new (total {}/{})",
                        term,
                        page,
                        page_new,
                        accepted.len(),
                        budget
                    );

                    working.set_cursor(
                        term,
                        QueryCursor {
                            window,
                            next_page: if consumed_page { page + 1 } else { page },
                            exhausted: false,
                        },
                    );
                }
                TermEvent::Done { term, cursor } => {
                    log::debug!("'{}' finished (exhausted: {})", term, cursor.exhausted);
                    stats.terms_completed += 1;
                    working.set_cursor(term, cursor);
                }
                TermEvent::Failed {
                    term,
                    page,
                    error,
                    retries,
                } => {
                    stats.retries += retries as usize;
                    log::error!(
                        "'{}' page {} failed after {} attempts",
                        term,
                        page,
                        retries + 1
                    );
                    return Err(self.fail(error));
                }
            }

            if accepted.len() >= budget {
                stats.truncated = true;
                log::info!("Article budget of {} reached, stopping early", budget);
                break;
            }
            self.transition(CrawlState::Fetching);
        }

        // Cancel any in-flight fetches before committing
        drop(events);

        self.transition(CrawlState::Committing);
        let finished_at = Utc::now();
        working.last_window = Some(window);
        working.last_run = Some(finished_at);

        if let Err(e) = self.store.save(&working).await {
            return Err(self.fail(e));
        }

        stats.accepted = accepted.len();
        stats.finished_at = finished_at;
        self.transition(CrawlState::Idle);

        log::info!(
            "Crawl committed: {} fetched, {} duplicates, {} out of window, {} accepted, {} errors; {} known articles",
            stats.fetched,
            stats.duplicates,
            stats.out_of_window,
            stats.accepted,
            stats.errors,
            working.len()
        );

        Ok(BatchResult {
            articles: accepted,
            stats,
        })
    }
}
