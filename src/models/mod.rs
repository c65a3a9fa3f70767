// src/models/mod.rs

//! Domain models for the news pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod article;
mod checkpoint;
mod config;
mod stats;
mod window;

// Re-export all public types
pub use article::Article;
pub use checkpoint::{CHECKPOINT_SCHEMA_VERSION, CheckpointState, Fingerprint, QueryCursor};
pub use config::{
    ApiConfig, Config, CrawlConfig, FingerprintMode, LoggingConfig, PathsConfig, RetryConfig,
    SqlConfig,
};
pub use stats::{BatchResult, RunStats};
pub use window::DateRange;
