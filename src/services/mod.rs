//! Service layer for talking to the upstream news source.
//!
//! - [`FetchClient`]: paging contract used by the crawler
//! - [`NewsApiClient`]: NewsAPI `/v2/everything` implementation

mod news_api;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Article, DateRange};

pub use news_api::{ApiArticle, ApiResponse, NewsApiClient};

/// One page request against the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub query: String,
    /// 1-based page number
    pub page: u32,
    pub page_size: usize,
    pub window: DateRange,
}

/// Validated page returned by the source.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub articles: Vec<Article>,
    /// Raw entries dropped at the boundary (missing URL, bad timestamp)
    pub rejected: usize,
    /// Next page to request, `None` when the source has no more results
    pub next_page: Option<u32>,
}

/// Paging contract for news sources.
///
/// Implementations map failures to `RateLimited`, `Unauthorized` or
/// `Unreachable`; the crawler decides whether to retry.
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Fetch one page of results.
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage>;

    /// Cheap reachability and credential check.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
