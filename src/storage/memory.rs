//! In-memory checkpoint store for tests and dry runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::CheckpointState;
use crate::storage::CheckpointStore;

/// Keeps the committed state in process memory.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    state: Mutex<Option<CheckpointState>>,
    saves: AtomicUsize,
    fail_saves: bool,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a committed state.
    pub fn with_state(state: CheckpointState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    /// Store whose `save` always fails, for exercising commit failures.
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the committed state, if any.
    pub fn snapshot(&self) -> Option<CheckpointState> {
        self.state.lock().ok().and_then(|guard| guard.clone())
    }

    fn poisoned() -> AppError {
        AppError::Io(std::io::Error::other("checkpoint mutex poisoned"))
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<CheckpointState> {
        let guard = self.state.lock().map_err(|_| Self::poisoned())?;
        Ok(guard.clone().unwrap_or_default())
    }

    async fn save(&self, state: &CheckpointState) -> Result<()> {
        if self.fail_saves {
            return Err(AppError::Io(std::io::Error::other(
                "simulated checkpoint write failure",
            )));
        }
        let mut guard = self.state.lock().map_err(|_| Self::poisoned())?;
        *guard = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut guard = self.state.lock().map_err(|_| Self::poisoned())?;
        *guard = None;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
