// src/error.rs

//! Unified error handling for the news pipeline.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration rejected before any fetch begins
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Persisted checkpoint could not be read back
    #[error("Corrupt checkpoint at {path}: {reason}")]
    CorruptCheckpoint { path: String, reason: String },

    /// Upstream API asked us to slow down
    #[error("Rate limited by news API: {0}")]
    RateLimited(String),

    /// API key missing, invalid or disabled
    #[error("Unauthorized by news API: {0}")]
    Unauthorized(String),

    /// Network failure, timeout, server error or malformed response
    #[error("News API unreachable: {0}")]
    Unreachable(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Crawler already failed; a fresh crawler must be built to retry
    #[error("Crawler is in the failed state; create a new crawler to retry")]
    CrawlerFailed,

    /// Export step failed
    #[error("Export error for {context}: {message}")]
    Export { context: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a checkpoint corruption error.
    pub fn corrupt(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        Self::CorruptCheckpoint {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an unreachable error.
    pub fn unreachable(message: impl fmt::Display) -> Self {
        Self::Unreachable(message.to_string())
    }

    /// Create an export error with context.
    pub fn export(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Export {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Unreachable(_))
    }
}
