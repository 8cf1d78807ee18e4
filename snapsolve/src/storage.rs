//! Blob store abstraction for transient upload persistence.
//!
//! Every request stores exactly one blob before OCR and deletes it before
//! responding, so the store only ever holds in-flight uploads. Keys are
//! generated per request and never derived solely from the client-supplied
//! filename: two concurrent uploads of `scan.png` must not be able to
//! delete each other's blob.

use crate::config::StorageConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("blob {key} not found")]
    NotFound { key: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Trait for blob store backends
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store uploaded bytes and return the storage key
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String>;

    /// Resolve a storage key to a local filesystem path
    async fn resolve(&self, key: &str) -> Result<PathBuf>;

    /// Delete a blob. Deleting a key that no longer exists is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a blob exists for the given key
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Local filesystem storage backend - stores blobs under a base directory.
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }
}

/// Reduce a client-supplied filename to a safe path component.
fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.bin");

    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let key = format!("uploads/{}-{}", Uuid::new_v4().simple(), sanitize_filename(filename));
        let full_path = self.base_path.join(&key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;

        Ok(key)
    }

    async fn resolve(&self, key: &str) -> Result<PathBuf> {
        let full_path = self.base_path.join(key);

        if !full_path.exists() {
            return Err(StorageError::NotFound { key: key.to_string() });
        }

        Ok(full_path)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.base_path.join(key);

        if full_path.exists() {
            fs::remove_file(&full_path).await?;
        }

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.base_path.join(key).exists())
    }
}

/// Create a blob store backend based on configuration
pub async fn create_blob_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    match config {
        StorageConfig::Local { path } => {
            tracing::info!("Creating local blob store (path: {:?})", path);
            fs::create_dir_all(path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create blob store directory {:?}: {}", path, e))?;
            Ok(Arc::new(LocalBlobStore::new(path.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_store_lifecycle() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(temp_dir.path().to_path_buf());

        let content = b"fake image bytes";

        let key = store.save("equation.png", content).await.unwrap();
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with("equation.png"));

        assert!(store.exists(&key).await.unwrap());

        let path = store.resolve(&key).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), content);

        store.delete(&key).await.unwrap();
        assert!(!store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_filename_gets_distinct_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(temp_dir.path().to_path_buf());

        let first = store.save("scan.png", b"one").await.unwrap();
        let second = store.save("scan.png", b"two").await.unwrap();

        assert_ne!(first, second);

        // Deleting one must not touch the other
        store.delete(&first).await.unwrap();
        assert!(store.exists(&second).await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_nonexistent_key() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(temp_dir.path().to_path_buf());

        let result = store.resolve("uploads/missing.png").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(temp_dir.path().to_path_buf());

        let key = store.save("scan.png", b"bytes").await.unwrap();
        store.delete(&key).await.unwrap();
        store.delete(&key).await.unwrap();
    }

    #[test]
    fn test_sanitize_filename_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("white space.png"), "white_space.png");
        assert_eq!(sanitize_filename("eq-1_a.PNG"), "eq-1_a.PNG");
    }
}
