// src/lib.rs

//! Stock News Crawler Library
//!
//! Incremental NewsAPI crawler with a persisted fingerprint checkpoint,
//! plus the processing and SQL stages that consume its batches.

pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
