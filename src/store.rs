//! Blob stores for persisting the geocode cache between sessions
//!
//! The cache treats the blob as opaque bytes; the store only has to hand
//! back what it was given.

use crate::error::{GeocacheError, GeocacheResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tracing::debug;

/// Opaque persistent storage for a single serialized blob
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Load the stored blob, or `None` if nothing has been saved yet
    async fn load(&self) -> GeocacheResult<Option<Vec<u8>>>;

    /// Replace the stored blob
    async fn save(&self, blob: &[u8]) -> GeocacheResult<()>;

    /// Human-readable location for display
    fn describe(&self) -> String;
}

/// Blob store backed by a single file on disk
pub struct FileBlobStore {
    path: PathBuf,
}

impl FileBlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the stored blob if present
    pub async fn remove(&self) -> GeocacheResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).await.map_err(|e| {
            GeocacheError::persistence(format!("removing {}", self.path.display()), e)
        })?;
        Ok(true)
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn load(&self) -> GeocacheResult<Option<Vec<u8>>> {
        if !self.path.exists() {
            debug!("No cache file at {}", self.path.display());
            return Ok(None);
        }

        let blob = fs::read(&self.path).await.map_err(|e| {
            GeocacheError::persistence(format!("reading {}", self.path.display()), e)
        })?;
        Ok(Some(blob))
    }

    async fn save(&self, blob: &[u8]) -> GeocacheResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                GeocacheError::persistence(format!("creating {}", parent.display()), e)
            })?;
        }

        // Previous cache stays intact until the rename
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, blob)
            .await
            .map_err(|e| GeocacheError::persistence(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            GeocacheError::persistence(format!("replacing {}", self.path.display()), e)
        })?;

        debug!("Wrote {} bytes to {}", blob.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory blob store, used for ephemeral sessions and tests
#[derive(Default)]
pub struct MemoryBlobStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing blob
    pub fn with_blob(blob: impl Into<Vec<u8>>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    /// Current contents, if any
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.blob
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn load(&self) -> GeocacheResult<Option<Vec<u8>>> {
        Ok(self.snapshot())
    }

    async fn save(&self, blob: &[u8]) -> GeocacheResult<()> {
        *self
            .blob
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(blob.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_store_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp.path().join("cache.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp.path().join("nested").join("cache.json"));

        store.save(b"{\"version\":1}").await.unwrap();
        let blob = store.load().await.unwrap().unwrap();
        assert_eq!(blob, b"{\"version\":1}");
        assert!(!temp.path().join("nested").join("cache.json.tmp").exists());
    }

    #[tokio::test]
    async fn file_store_remove() {
        let temp = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp.path().join("cache.json"));

        assert!(!store.remove().await.unwrap());
        store.save(b"x").await.unwrap();
        assert!(store.remove().await.unwrap());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_failures_are_persistence_errors() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = FileBlobStore::new(blocker.join("cache.json"));

        let err = store.save(b"{}").await.unwrap_err();
        assert!(matches!(err, GeocacheError::Persistence { .. }));
        assert_eq!(err.kind(), Some(crate::geocode::ErrorKind::Persistence));
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(b"abc").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some(&b"abc"[..]));
    }
}
