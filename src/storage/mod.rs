//! Checkpoint persistence.
//!
//! The crawler only sees the [`CheckpointStore`] trait, so the JSON file
//! backend can be replaced by a transactional store without touching the
//! crawl logic.
//!
//! ## File Layout
//!
//! ```text
//! {data_dir}/
//! ├── checkpoint.json        # Seen fingerprints, cursors, last run
//! ├── checkpoint.json.tmp    # Only present while a save is in flight
//! └── stock_news_batch_*.json
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CheckpointState;

// Re-export for convenience
pub use local::JsonCheckpointStore;
pub use memory::MemoryCheckpointStore;

/// Trait for checkpoint storage backends.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the last committed state.
    ///
    /// Returns an empty state when nothing has been committed yet and
    /// `AppError::CorruptCheckpoint` when persisted data cannot be used.
    async fn load(&self) -> Result<CheckpointState>;

    /// Replace the committed state atomically.
    async fn save(&self, state: &CheckpointState) -> Result<()>;

    /// Discard the committed state so the next load starts empty.
    async fn reset(&self) -> Result<()>;

    /// Human readable location for log output.
    fn location(&self) -> String;
}
