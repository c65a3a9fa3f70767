// src/services/news_api.rs

//! NewsAPI client.
//!
//! Responses are decoded into the tagged [`ApiResponse`] enum and each raw
//! article is validated into an [`Article`] before it leaves this module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{FetchClient, FetchedPage, PageRequest};
use crate::error::{AppError, Result};
use crate::models::{ApiConfig, Article, DateRange};
use crate::utils::http;

/// NewsAPI caps `pageSize` at 100.
const MAX_PAGE_SIZE: usize = 100;

/// Wire format of `/v2/everything`.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse {
    Ok {
        #[serde(rename = "totalResults", default)]
        total_results: u64,
        #[serde(default)]
        articles: Vec<ApiArticle>,
    },
    Error {
        #[serde(default)]
        code: String,
        #[serde(default)]
        message: String,
    },
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Raw article as returned by the API; every field may be missing.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiArticle {
    #[serde(default)]
    pub source: ApiSource,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
}

impl ApiArticle {
    /// Validate into an [`Article`], or `None` if it cannot be identified.
    pub fn into_article(self, scraped_at: DateTime<Utc>, window: &DateRange) -> Option<Article> {
        let url = self.url.map(|u| u.trim().to_string()).unwrap_or_default();
        if url.is_empty() || url::Url::parse(&url).is_err() {
            return None;
        }

        let source = self.source.name.unwrap_or_default();
        // NewsAPI tombstones for takedowns
        if source == "[Removed]" {
            return None;
        }

        let published_at = self
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())?
            .with_timezone(&Utc);

        Some(Article {
            source_id: self.source.id,
            source,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            url,
            published_at,
            author: self.author.unwrap_or_default(),
            image_url: self.url_to_image.unwrap_or_default(),
            scraped_at,
            date_range: window.label(),
        })
    }
}

/// Map an API error code (or bare HTTP status) to the fetch taxonomy.
fn classify(status: StatusCode, code: &str, message: &str) -> AppError {
    let detail = if code.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", code, message)
    };

    if code == "rateLimited" || status == StatusCode::TOO_MANY_REQUESTS {
        AppError::RateLimited(detail)
    } else if code.starts_with("apiKey")
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        AppError::Unauthorized(detail)
    } else {
        AppError::Unreachable(detail)
    }
}

/// Decode a raw HTTP response into a validated page.
pub(crate) fn decode_page(
    status: StatusCode,
    body: &str,
    request: &PageRequest,
    scraped_at: DateTime<Utc>,
) -> Result<FetchedPage> {
    let parsed: std::result::Result<ApiResponse, _> = serde_json::from_str(body);

    match parsed {
        Ok(ApiResponse::Ok {
            total_results,
            articles,
        }) if status.is_success() => {
            let raw_count = articles.len();
            let mut page = FetchedPage::default();

            for raw in articles {
                match raw.into_article(scraped_at, &request.window) {
                    Some(article) => page.articles.push(article),
                    None => page.rejected += 1,
                }
            }

            // The server never serves more than MAX_PAGE_SIZE per page
            let served_size = request.page_size.min(MAX_PAGE_SIZE) as u64;
            let seen_so_far = u64::from(request.page) * served_size;
            if raw_count > 0 && seen_so_far < total_results {
                page.next_page = Some(request.page + 1);
            }
            Ok(page)
        }
        // Free plans stop paging past the first 100 results
        Ok(ApiResponse::Error { code, .. }) if code == "maximumResultsReached" => {
            log::debug!(
                "'{}' page {}: maximum results reached",
                request.query,
                request.page
            );
            Ok(FetchedPage::default())
        }
        Ok(ApiResponse::Error { code, message }) => Err(classify(status, &code, &message)),
        Ok(ApiResponse::Ok { .. }) => Err(classify(status, "", "")),
        Err(e) if status.is_success() => Err(AppError::unreachable(format!(
            "malformed response: {}",
            e
        ))),
        Err(_) => Err(classify(status, "", "")),
    }
}

/// Client for the NewsAPI `everything` endpoint.
pub struct NewsApiClient {
    client: Client,
    config: ApiConfig,
}

impl NewsApiClient {
    /// Create a client; fails fast when no API key is configured.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::config(
                "api.api_key is empty (set it in the config or NEWS_API_KEY)",
            ));
        }

        Ok(Self {
            client: http::create_client(config)?,
            config: config.clone(),
        })
    }

    fn query_params(&self, request: &PageRequest) -> Vec<(&'static str, String)> {
        vec![
            ("q", request.query.clone()),
            ("language", self.config.language.clone()),
            ("pageSize", request.page_size.min(MAX_PAGE_SIZE).to_string()),
            ("page", request.page.to_string()),
            ("from", request.window.from.format("%Y-%m-%d").to_string()),
            ("to", request.window.to.format("%Y-%m-%d").to_string()),
            ("sortBy", "publishedAt".to_string()),
        ]
    }

    async fn send(&self, request: &PageRequest) -> Result<FetchedPage> {
        let response = self
            .client
            .get(&self.config.base_url)
            .header("X-Api-Key", &self.config.api_key)
            .query(&self.query_params(request))
            .send()
            .await
            .map_err(AppError::unreachable)?;

        let status = response.status();
        let body = response.text().await.map_err(AppError::unreachable)?;

        decode_page(status, &body, request, Utc::now())
    }
}

#[async_trait]
impl FetchClient for NewsApiClient {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage> {
        let page = self.send(request).await?;
        log::debug!(
            "'{}' page {}: {} articles ({} rejected), next: {:?}",
            request.query,
            request.page,
            page.articles.len(),
            page.rejected,
            page.next_page
        );
        Ok(page)
    }

    async fn health_check(&self) -> Result<()> {
        let request = PageRequest {
            query: "stock".to_string(),
            page: 1,
            page_size: 1,
            window: DateRange::ending(Utc::now().date_naive(), 1),
        };
        self.send(&request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request(page: u32, page_size: usize) -> PageRequest {
        PageRequest {
            query: "finance".to_string(),
            page,
            page_size,
            window: DateRange::ending(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), 7),
        }
    }

    const OK_BODY: &str = r#"{
        "status": "ok",
        "totalResults": 25,
        "articles": [
            {
                "source": {"id": "reuters", "name": "Reuters"},
                "author": "Jane Doe",
                "title": "Stocks rally",
                "description": "Equities climbed.",
                "url": "https://www.reuters.com/a",
                "urlToImage": "https://img.example.com/a.jpg",
                "publishedAt": "2026-10-18T09:30:00Z",
                "content": "..."
            },
            {
                "source": {"id": null, "name": "Blog"},
                "title": "No link",
                "url": null,
                "publishedAt": "2026-10-18T09:30:00Z"
            },
            {
                "source": {"id": null, "name": "[Removed]"},
                "title": "[Removed]",
                "url": "https://removed.com",
                "publishedAt": "1970-01-01T00:00:00Z"
            }
        ]
    }"#;

    #[test]
    fn test_decode_ok_page() {
        let page = decode_page(StatusCode::OK, OK_BODY, &request(1, 10), Utc::now()).unwrap();
        assert_eq!(page.articles.len(), 1);
        assert_eq!(page.rejected, 2);
        assert_eq!(page.next_page, Some(2));

        let article = &page.articles[0];
        assert_eq!(article.source, "Reuters");
        assert_eq!(article.source_id.as_deref(), Some("reuters"));
        assert_eq!(article.image_url, "https://img.example.com/a.jpg");
        assert_eq!(article.date_range, "2026-10-12_to_2026-10-19");
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page = decode_page(StatusCode::OK, OK_BODY, &request(3, 10), Utc::now()).unwrap();
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn test_oversized_page_request_keeps_paging() {
        let articles: Vec<String> = (0..100)
            .map(|i| {
                format!(
                    r#"{{"source":{{"id":null,"name":"Wire"}},"title":"t{i}","url":"https://a.com/{i}","publishedAt":"2026-10-18T09:30:00Z"}}"#
                )
            })
            .collect();
        let body = format!(
            r#"{{"status":"ok","totalResults":200,"articles":[{}]}}"#,
            articles.join(",")
        );

        let page = decode_page(StatusCode::OK, &body, &request(1, 250), Utc::now()).unwrap();
        assert_eq!(page.articles.len(), 100);
        assert_eq!(page.next_page, Some(2));

        let last = decode_page(StatusCode::OK, &body, &request(2, 250), Utc::now()).unwrap();
        assert_eq!(last.next_page, None);
    }

    #[test]
    fn test_rate_limited() {
        let body = r#"{"status":"error","code":"rateLimited","message":"slow down"}"#;
        let err = decode_page(StatusCode::TOO_MANY_REQUESTS, body, &request(1, 10), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_unauthorized() {
        let body = r#"{"status":"error","code":"apiKeyInvalid","message":"bad key"}"#;
        let err =
            decode_page(StatusCode::UNAUTHORIZED, body, &request(1, 10), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_server_error_without_body_is_unreachable() {
        let err = decode_page(
            StatusCode::BAD_GATEWAY,
            "<html>bad gateway</html>",
            &request(1, 10),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Unreachable(_)));
    }

    #[test]
    fn test_malformed_success_body_is_unreachable() {
        let err = decode_page(StatusCode::OK, r#"{"status":"ok","articles":5}"#, &request(1, 10), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::Unreachable(_)));
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn test_maximum_results_ends_paging() {
        let body = r#"{"status":"error","code":"maximumResultsReached","message":"upgrade"}"#;
        let page = decode_page(
            StatusCode::UPGRADE_REQUIRED,
            body,
            &request(6, 20),
            Utc::now(),
        )
        .unwrap();
        assert!(page.articles.is_empty());
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = ApiConfig::default();
        assert!(matches!(
            NewsApiClient::new(&config),
            Err(AppError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_page_size_is_capped() {
        let config = ApiConfig {
            api_key: "test-key".to_string(),
            ..ApiConfig::default()
        };
        let client = NewsApiClient::new(&config).unwrap();
        let params = client.query_params(&request(1, 500));
        assert!(params.contains(&("pageSize", "100".to_string())));
        assert!(params.contains(&("from", "2026-10-12".to_string())));
    }
}
