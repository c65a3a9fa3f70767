// src/pipeline/process.rs

//! Batch normalization and summary statistics.
//!
//! Raw batch articles are flattened into [`ProcessedArticle`] rows with
//! cleaned text and derived columns, deduplicated by URL and summarized
//! for the processed-data exports.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Article;
use crate::utils::get_domain;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Sources listed in [`SummaryStats::top_sources`].
const TOP_SOURCES: usize = 5;
/// Days listed in [`SummaryStats::articles_by_date`].
const DATES_SHOWN: usize = 10;

/// Flat, cleaned row derived from an [`Article`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedArticle {
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub published_at: String,
    pub author: String,
    pub image_url: String,
    pub scraped_at: String,
    pub date_range: String,
    pub has_image: bool,
    pub has_author: bool,
    pub domain: String,
    pub published_date: String,
    pub scraped_date: String,
    pub word_count: usize,
}

impl ProcessedArticle {
    /// Column names, in [`Self::fields`] order.
    pub const COLUMNS: [&'static str; 15] = [
        "title",
        "description",
        "url",
        "source",
        "published_at",
        "author",
        "image_url",
        "scraped_at",
        "date_range",
        "has_image",
        "has_author",
        "domain",
        "published_date",
        "scraped_date",
        "word_count",
    ];

    /// Field values rendered as text, matching [`Self::COLUMNS`].
    pub fn fields(&self) -> [String; 15] {
        [
            self.title.clone(),
            self.description.clone(),
            self.url.clone(),
            self.source.clone(),
            self.published_at.clone(),
            self.author.clone(),
            self.image_url.clone(),
            self.scraped_at.clone(),
            self.date_range.clone(),
            self.has_image.to_string(),
            self.has_author.to_string(),
            self.domain.clone(),
            self.published_date.clone(),
            self.scraped_date.clone(),
            self.word_count.to_string(),
        ]
    }
}

/// Trim and collapse runs of whitespace to single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn format_datetime(ts: &DateTime<Utc>) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

fn format_date(ts: &DateTime<Utc>) -> String {
    ts.format(DATE_FORMAT).to_string()
}

/// Build the processed row for one article.
pub fn normalize(article: &Article) -> ProcessedArticle {
    let url = article.url.trim().to_string();
    let author = clean_text(&article.author);
    let image_url = article.image_url.trim().to_string();

    ProcessedArticle {
        title: clean_text(&article.title),
        description: clean_text(&article.description),
        domain: get_domain(&url).unwrap_or_default(),
        url,
        source: clean_text(&article.source),
        published_at: format_datetime(&article.published_at),
        has_author: !author.is_empty(),
        author,
        has_image: !image_url.is_empty(),
        image_url,
        scraped_at: format_datetime(&article.scraped_at),
        date_range: article.date_range.clone(),
        published_date: format_date(&article.published_at),
        scraped_date: format_date(&article.scraped_at),
        word_count: article.description.split_whitespace().count(),
    }
}

/// Keep the first row for each URL. Returns the rows kept and the number
/// removed.
pub fn dedupe_by_url(rows: Vec<ProcessedArticle>) -> (Vec<ProcessedArticle>, usize) {
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<ProcessedArticle> = rows
        .into_iter()
        .filter(|row| seen.insert(row.url.clone()))
        .collect();
    let removed = before - kept.len();
    if removed > 0 {
        log::info!("Removed {} duplicate articles", removed);
    }
    (kept, removed)
}

/// Normalize then deduplicate a set of raw articles.
pub fn process_articles(articles: &[Article]) -> (Vec<ProcessedArticle>, usize) {
    log::info!("Normalizing {} articles", articles.len());
    dedupe_by_url(articles.iter().map(normalize).collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
}

/// Aggregate view over processed rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_articles: usize,
    pub unique_sources: usize,
    /// `"{earliest} to {latest}"` over published dates, empty without rows
    pub date_range: String,
    pub articles_with_images: usize,
    pub articles_with_authors: usize,
    /// Most frequent sources, ties broken by name
    pub top_sources: Vec<SourceCount>,
    /// Article count for the earliest published dates
    pub articles_by_date: BTreeMap<String, usize>,
}

impl SummaryStats {
    pub fn from_rows(rows: &[ProcessedArticle]) -> Self {
        let mut by_source: HashMap<&str, usize> = HashMap::new();
        let mut by_date: BTreeMap<String, usize> = BTreeMap::new();
        for row in rows {
            *by_source.entry(row.source.as_str()).or_default() += 1;
            *by_date.entry(row.published_date.clone()).or_default() += 1;
        }

        let date_range = match (by_date.keys().next(), by_date.keys().next_back()) {
            (Some(first), Some(last)) => format!("{} to {}", first, last),
            _ => String::new(),
        };

        let mut top_sources: Vec<SourceCount> = by_source
            .iter()
            .map(|(source, count)| SourceCount {
                source: source.to_string(),
                count: *count,
            })
            .collect();
        top_sources.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source.cmp(&b.source)));
        top_sources.truncate(TOP_SOURCES);

        Self {
            total_articles: rows.len(),
            unique_sources: by_source.len(),
            date_range,
            articles_with_images: rows.iter().filter(|r| r.has_image).count(),
            articles_with_authors: rows.iter().filter(|r| r.has_author).count(),
            top_sources,
            articles_by_date: by_date.into_iter().take(DATES_SHOWN).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(url: &str, source: &str, day: u32) -> Article {
        Article {
            source_id: None,
            source: source.to_string(),
            title: "  Stocks   rally\n again ".to_string(),
            description: "Equities climbed on\tstrong earnings".to_string(),
            url: url.to_string(),
            published_at: Utc.with_ymd_and_hms(2026, 10, day, 14, 30, 5).unwrap(),
            author: String::new(),
            image_url: String::new(),
            scraped_at: Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap(),
            date_range: "2026-10-12_to_2026-10-19".to_string(),
        }
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a \n b\t\tc  "), "a b c");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_normalize_derives_columns() {
        let mut raw = article("https://www.reuters.com/markets/x", "Reuters", 18);
        raw.image_url = "https://img.example.com/x.jpg".to_string();

        let row = normalize(&raw);
        assert_eq!(row.title, "Stocks rally again");
        assert_eq!(row.published_at, "2026-10-18 14:30:05");
        assert_eq!(row.published_date, "2026-10-18");
        assert_eq!(row.scraped_date, "2026-10-19");
        assert_eq!(row.domain, "www.reuters.com");
        assert_eq!(row.word_count, 5);
        assert!(row.has_image);
        assert!(!row.has_author);
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let rows = vec![
            normalize(&article("https://a.com/1", "First", 18)),
            normalize(&article("https://a.com/2", "Other", 18)),
            normalize(&article("https://a.com/1", "Second", 17)),
        ];
        let (kept, removed) = dedupe_by_url(rows);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].source, "First");
    }

    #[test]
    fn test_summary_stats() {
        let mut articles = vec![
            article("https://a.com/1", "Reuters", 18),
            article("https://a.com/2", "Reuters", 17),
            article("https://a.com/3", "Bloomberg", 18),
            article("https://a.com/4", "AP", 15),
        ];
        articles[0].author = "Jane".to_string();
        articles[2].image_url = "https://img/x.png".to_string();

        let (rows, _) = process_articles(&articles);
        let stats = SummaryStats::from_rows(&rows);

        assert_eq!(stats.total_articles, 4);
        assert_eq!(stats.unique_sources, 3);
        assert_eq!(stats.date_range, "2026-10-15 to 2026-10-18");
        assert_eq!(stats.articles_with_images, 1);
        assert_eq!(stats.articles_with_authors, 1);
        assert_eq!(
            stats.top_sources[0],
            SourceCount {
                source: "Reuters".to_string(),
                count: 2
            }
        );
        // Ties ordered by name
        assert_eq!(stats.top_sources[1].source, "AP");
        assert_eq!(stats.articles_by_date.get("2026-10-18"), Some(&2));
    }

    #[test]
    fn test_summary_limits() {
        let articles: Vec<Article> = (1..=12)
            .map(|d| article(&format!("https://a.com/{}", d), &format!("S{:02}", d), d))
            .collect();
        let (rows, _) = process_articles(&articles);
        let stats = SummaryStats::from_rows(&rows);

        assert_eq!(stats.top_sources.len(), 5);
        assert_eq!(stats.articles_by_date.len(), 10);
        assert_eq!(
            stats.articles_by_date.keys().next().map(String::as_str),
            Some("2026-10-01")
        );
    }

    #[test]
    fn test_summary_of_nothing() {
        let stats = SummaryStats::from_rows(&[]);
        assert_eq!(stats.total_articles, 0);
        assert!(stats.date_range.is_empty());
        assert!(stats.top_sources.is_empty());
    }
}
