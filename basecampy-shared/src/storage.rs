//! Uploaded file storage
//!
//! [`LocalStorage`] writes uploads under one directory, which the API server
//! also serves statically, so every stored file has a public URL.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

/// A stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Public URL of the file
    pub url: String,

    /// Location of the file in storage
    pub local_path: String,

    /// MIME type given by the uploader
    pub mimetype: String,

    /// Size in bytes
    pub size: u64,
}

/// Storage failure
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file name: {0}")]
    InvalidName(String),
}

/// Stores uploaded files
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores `content` and returns where it ended up
    async fn store(
        &self,
        original_name: &str,
        mimetype: &str,
        content: Bytes,
    ) -> Result<StoredFile, StorageError>;

    /// Removes a previously stored file; missing files are not an error
    async fn remove(&self, local_path: &str) -> Result<(), StorageError>;
}

/// Stores files in a local directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    /// `public_base_url` is the URL the server exposes `root` under
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Reduces an uploaded file name to a safe, flat file name
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn store(
        &self,
        original_name: &str,
        mimetype: &str,
        content: Bytes,
    ) -> Result<StoredFile, StorageError> {
        let name = sanitize_file_name(original_name)
            .ok_or_else(|| StorageError::InvalidName(original_name.to_string()))?;
        let file_name = format!("{}-{}", Uuid::new_v4().simple(), name);

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, &content).await?;

        tracing::debug!(path = %path.display(), size = content.len(), "Stored upload");

        Ok(StoredFile {
            url: format!("{}/{}", self.public_base_url, file_name),
            local_path: path.to_string_lossy().into_owned(),
            mimetype: mimetype.to_string(),
            size: content.len() as u64,
        })
    }

    async fn remove(&self, local_path: &str) -> Result<(), StorageError> {
        let path = Path::new(local_path);
        if !path.starts_with(&self.root) {
            return Err(StorageError::InvalidName(local_path.to_string()));
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_storage() -> LocalStorage {
        let root = std::env::temp_dir().join(format!("basecampy-storage-{}", Uuid::new_v4()));
        LocalStorage::new(root, "http://localhost:8080/images/")
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("me.png").as_deref(), Some("me.png"));
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_file_name("C:\\pics\\my pic.jpg").as_deref(), Some("my_pic.jpg"));
        assert_eq!(sanitize_file_name(".hidden").as_deref(), Some("hidden"));
        assert!(sanitize_file_name("...").is_none());
        assert!(sanitize_file_name("").is_none());
    }

    #[tokio::test]
    async fn test_store_and_remove() {
        let storage = scratch_storage();

        let stored = storage
            .store("avatar.png", "image/png", Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap();

        assert!(stored.url.starts_with("http://localhost:8080/images/"));
        assert!(stored.url.ends_with("-avatar.png"));
        assert_eq!(stored.size, 4);
        assert_eq!(stored.mimetype, "image/png");
        assert_eq!(tokio::fs::read(&stored.local_path).await.unwrap(), b"\x89PNG");

        storage.remove(&stored.local_path).await.unwrap();
        assert!(!Path::new(&stored.local_path).exists());

        // Removing twice is fine
        storage.remove(&stored.local_path).await.unwrap();

        let _ = tokio::fs::remove_dir_all(storage.root()).await;
    }

    #[tokio::test]
    async fn test_remove_outside_root_rejected() {
        let storage = scratch_storage();
        assert!(matches!(
            storage.remove("/etc/hosts").await,
            Err(StorageError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_store_rejects_empty_name() {
        let storage = scratch_storage();
        assert!(matches!(
            storage.store("..", "image/png", Bytes::new()).await,
            Err(StorageError::InvalidName(_))
        ));
    }
}
