//! Local filesystem checkpoint store.
//!
//! Persists [`CheckpointState`] as pretty-printed JSON. Saves are atomic
//! (temp file + rename) and a crash mid-save leaves the previous
//! checkpoint untouched.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{CHECKPOINT_SCHEMA_VERSION, CheckpointState};
use crate::storage::CheckpointStore;
use crate::utils::fs::{read_bytes_optional, write_json_atomic};

/// Just enough of the file to check compatibility before a full parse.
#[derive(Deserialize)]
struct VersionHeader {
    schema_version: Option<u32>,
}

/// JSON file checkpoint backend.
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    /// Create a store persisting to the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(&self, bytes: &[u8]) -> Result<CheckpointState> {
        let header: VersionHeader =
            serde_json::from_slice(bytes).map_err(|e| AppError::corrupt(&self.path, e))?;

        match header.schema_version {
            Some(CHECKPOINT_SCHEMA_VERSION) => {}
            Some(other) => {
                return Err(AppError::corrupt(
                    &self.path,
                    format!(
                        "schema version {} is not supported (expected {})",
                        other, CHECKPOINT_SCHEMA_VERSION
                    ),
                ));
            }
            None => return Err(AppError::corrupt(&self.path, "missing schema_version")),
        }

        serde_json::from_slice(bytes).map_err(|e| AppError::corrupt(&self.path, e))
    }
}

#[async_trait]
impl CheckpointStore for JsonCheckpointStore {
    async fn load(&self) -> Result<CheckpointState> {
        match read_bytes_optional(&self.path).await? {
            Some(bytes) => {
                let state = self.decode(&bytes)?;
                log::info!(
                    "Loaded checkpoint with {} seen articles from {}",
                    state.len(),
                    self.path.display()
                );
                Ok(state)
            }
            None => {
                log::info!("No checkpoint at {}, starting fresh", self.path.display());
                Ok(CheckpointState::new())
            }
        }
    }

    async fn save(&self, state: &CheckpointState) -> Result<()> {
        write_json_atomic(&self.path, state).await?;
        log::debug!(
            "Checkpoint saved: {} fingerprints -> {}",
            state.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.path).await? {
            let mut name = self
                .path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_default();
            name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d_%H%M%S")));
            let aside = self.path.with_file_name(name);

            tokio::fs::rename(&self.path, &aside).await?;
            log::warn!("Checkpoint moved aside to {}", aside.display());
        }
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Fingerprint;
    use crate::utils::fs::temp_path;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn state_with(fps: &[&str]) -> CheckpointState {
        let mut state = CheckpointState::new();
        let published = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        for fp in fps {
            state.insert(Fingerprint::new(*fp), published);
        }
        state
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonCheckpointStore::new(tmp.path().join("checkpoint.json"));

        let state = store.load().await.unwrap();
        assert!(state.is_empty());
        assert_eq!(state.schema_version, CHECKPOINT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let store = JsonCheckpointStore::new(tmp.path().join("data/checkpoint.json"));

        let state = state_with(&["a", "b"]);
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, state);
        assert!(!temp_path(store.path()).exists());
    }

    #[tokio::test]
    async fn test_garbage_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("checkpoint.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = JsonCheckpointStore::new(&path);
        assert!(matches!(
            store.load().await,
            Err(AppError::CorruptCheckpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_major_version_mismatch_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("checkpoint.json");
        std::fs::write(&path, br#"{"schema_version": 2, "seen": {}}"#).unwrap();

        let store = JsonCheckpointStore::new(&path);
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, AppError::CorruptCheckpoint { .. }));
        assert!(err.to_string().contains("schema version 2"));
    }

    #[tokio::test]
    async fn test_missing_version_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("checkpoint.json");
        std::fs::write(&path, br#"{"collected_urls": ["https://example.com/a"]}"#).unwrap();

        let store = JsonCheckpointStore::new(&path);
        assert!(matches!(
            store.load().await,
            Err(AppError::CorruptCheckpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_interrupted_save_keeps_previous_state() {
        let tmp = TempDir::new().unwrap();
        let store = JsonCheckpointStore::new(tmp.path().join("checkpoint.json"));

        let committed = state_with(&["a"]);
        store.save(&committed).await.unwrap();

        // Crash after writing part of the temp file, before the rename
        std::fs::write(temp_path(store.path()), br#"{"schema_version": 1, "seen": {"b"#)
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, committed);

        // The next successful save replaces the stale temp file
        let next = state_with(&["a", "b"]);
        store.save(&next).await.unwrap();
        assert_eq!(store.load().await.unwrap(), next);
        assert!(!temp_path(store.path()).exists());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("checkpoint.json");
        // A directory at the target path makes the final rename fail
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let store = JsonCheckpointStore::new(&path);
        assert!(store.save(&state_with(&["a"])).await.is_err());
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_reset_moves_file_aside() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("checkpoint.json");
        std::fs::write(&path, b"garbage").unwrap();

        let store = JsonCheckpointStore::new(&path);
        store.reset().await.unwrap();

        assert!(!path.exists());
        assert!(store.load().await.unwrap().is_empty());
        let moved = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().contains(".corrupt-"));
        assert!(moved);
    }
}
