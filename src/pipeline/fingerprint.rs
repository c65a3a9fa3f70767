//! Article identity for cross-run deduplication.
//!
//! The fingerprint is the SHA-256 of a normalized identity string, so
//! cosmetic URL differences (surrounding whitespace, scheme/host case,
//! fragments, `utm_*` tracking parameters) collapse to the same key.
//! Any fingerprint match is treated as a duplicate.

use chrono::SecondsFormat;
use sha2::{Digest, Sha256};
use url::Url;

use crate::models::{Article, Fingerprint, FingerprintMode};

/// Derives fingerprints under a fixed identity mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fingerprinter {
    mode: FingerprintMode,
}

impl Fingerprinter {
    pub fn new(mode: FingerprintMode) -> Self {
        Self { mode }
    }

    /// Compute the fingerprint of an article.
    pub fn fingerprint(&self, article: &Article) -> Fingerprint {
        let mut key = normalize_url(&article.url);
        if self.mode == FingerprintMode::UrlAndPublished {
            key.push('|');
            key.push_str(
                &article
                    .published_at
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        }

        let digest = Sha256::digest(key.as_bytes());
        Fingerprint::new(hex::encode(digest))
    }
}

/// Convenience function using the default (URL only) mode.
pub fn fingerprint(article: &Article) -> Fingerprint {
    Fingerprinter::default().fingerprint(article)
}

/// Normalize a URL for identity comparison.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();

    let Ok(mut parsed) = Url::parse(trimmed) else {
        return lowercase_authority(trimmed);
    };

    parsed.set_fragment(None);

    if parsed.query().is_some() {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(k, _)| !k.to_ascii_lowercase().starts_with("utm_"))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    parsed.to_string()
}

/// Lowercase `scheme://host` of a string the URL parser rejected.
fn lowercase_authority(s: &str) -> String {
    let Some(scheme_end) = s.find("://") else {
        return s.to_string();
    };
    let rest = &s[scheme_end + 3..];
    let host_end = rest.find('/').map_or(s.len(), |i| scheme_end + 3 + i);

    format!("{}{}", s[..host_end].to_lowercase(), &s[host_end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn article(url: &str, hour: u32) -> Article {
        let published = Utc.with_ymd_and_hms(2026, 10, 18, hour, 0, 0).unwrap();
        Article {
            source_id: None,
            source: "Example".to_string(),
            title: "Title".to_string(),
            description: String::new(),
            url: url.to_string(),
            published_at: published,
            author: String::new(),
            image_url: String::new(),
            scraped_at: published,
            date_range: String::new(),
        }
    }

    #[test]
    fn test_same_url_same_fingerprint() {
        let a = article("https://example.com/a", 9);
        let mut b = article("https://example.com/a", 9);
        b.title = "Completely different headline".to_string();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_formatting_differences_collapse() {
        let a = article("https://example.com/markets/story?id=7", 9);
        let b = article("  HTTPS://Example.COM/markets/story?id=7#comments \n", 9);
        let c = article("https://example.com/markets/story?id=7&utm_source=rss", 9);
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn test_path_case_is_significant() {
        let a = article("https://example.com/Story", 9);
        let b = article("https://example.com/story", 9);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_url_and_published_mode() {
        let fp = Fingerprinter::new(FingerprintMode::UrlAndPublished);
        let a = article("https://example.com/a", 9);
        let b = article(" https://EXAMPLE.com/a", 9);
        let later = article("https://example.com/a", 10);
        assert_eq!(fp.fingerprint(&a), fp.fingerprint(&b));
        assert_ne!(fp.fingerprint(&a), fp.fingerprint(&later));

        // URL-only mode ignores the timestamp
        assert_eq!(fingerprint(&a), fingerprint(&later));
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = fingerprint(&article("https://example.com/a", 9));
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_normalize_url_strips_only_tracking_params() {
        assert_eq!(
            normalize_url("https://example.com/a?utm_medium=x&page=2"),
            "https://example.com/a?page=2"
        );
        assert_eq!(
            normalize_url("https://example.com/a?utm_medium=x"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_normalize_unparsable_url() {
        assert_eq!(normalize_url("  HTTP://Bad Host/Path "), "http://bad host/Path");
        assert_eq!(normalize_url("not a url"), "not a url");
    }
}
