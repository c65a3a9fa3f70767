//! File system utilities.
//!
//! Every write in the pipeline goes through [`write_bytes_atomic`]: data is
//! written to a sibling `.tmp` file, synced, then renamed over the target,
//! so a reader sees either the previous content or the new content.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Removes a temporary file on drop unless the write was committed.
#[derive(Debug)]
pub struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The temp file has been renamed into place; nothing to clean up.
    pub fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove temp file {:?}: {}", self.path, e);
                }
            }
        }
    }
}

/// Temp path next to `path`: `checkpoint.json` -> `checkpoint.json.tmp`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Ensure parent directory exists.
pub async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Write bytes atomically (write to temp, then rename).
pub async fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent(path).await?;

    let guard = TempFileGuard::new(temp_path(path));
    {
        let mut file = tokio::fs::File::create(guard.path()).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
    }

    tokio::fs::rename(guard.path(), path).await?;
    guard.commit();
    Ok(())
}

/// Write JSON data atomically with pretty printing.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &bytes).await
}

/// Read bytes, returning None if file doesn't exist.
pub async fn read_bytes_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("data/checkpoint.json")),
            PathBuf::from("data/checkpoint.json.tmp")
        );
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/test.txt");

        write_bytes_atomic(&path, b"hello").await.unwrap();
        let data = read_bytes_optional(&path).await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let data = read_bytes_optional(&tmp.path().join("nope.txt"))
            .await
            .unwrap();
        assert!(data.is_none());
    }

    #[test]
    fn test_guard_removes_uncommitted_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.tmp");
        std::fs::write(&path, b"partial").unwrap();

        drop(TempFileGuard::new(&path));
        assert!(!path.exists());
    }

    #[test]
    fn test_guard_keeps_committed_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.tmp");
        std::fs::write(&path, b"data").unwrap();

        TempFileGuard::new(&path).commit();
        assert!(path.exists());
    }
}
