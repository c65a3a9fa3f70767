//! Article data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news article fetched from the upstream API.
///
/// Articles are never mutated after the fetch client builds them; every
/// later stage reads them by reference or copies them into its own record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Upstream source identifier (absent for many publishers)
    #[serde(default)]
    pub source_id: Option<String>,

    /// Publisher display name
    #[serde(default)]
    pub source: String,

    /// Headline
    #[serde(default)]
    pub title: String,

    /// Summary text supplied by the API
    #[serde(default)]
    pub description: String,

    /// Canonical link to the article
    pub url: String,

    /// Publication timestamp
    pub published_at: DateTime<Utc>,

    /// Byline (empty when unknown)
    #[serde(default)]
    pub author: String,

    /// Lead image URL (empty when absent)
    #[serde(default)]
    pub image_url: String,

    /// When this crawler received the article
    pub scraped_at: DateTime<Utc>,

    /// Query window label, e.g. `2026-10-12_to_2026-10-19`
    #[serde(default)]
    pub date_range: String,
}

impl Article {
    /// Format article for display using a template.
    ///
    /// Supported placeholders:
    /// - `{source}`, `{title}`, `{url}`, `{author}`, `{published}`
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{source}", &self.source)
            .replace("{title}", &self.title)
            .replace("{url}", &self.url)
            .replace("{author}", &self.author)
            .replace(
                "{published}",
                &self.published_at.format("%Y-%m-%d %H:%M").to_string(),
            )
    }
}
