//! Utility functions and helpers.

pub mod fs;
pub mod http;
pub mod log;

use url::Url;

/// Extract the host of a URL.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str.trim())
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}
