//! Object storage for uploaded files and avatars.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    InvalidPath(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "Storage I/O error: {err}"),
            StorageError::InvalidPath(path) => write!(f, "Invalid storage path: {path}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` at `path`, replacing any existing object, and return its
    /// public URL.
    async fn put(&self, path: &str, data: Bytes) -> Result<StoredObject, StorageError>;

    /// Remove the object at `path`. Removing a missing object succeeds.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Objects as files under a root directory, served from `base_url`.
pub struct LocalObjectStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let valid = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(&self, path: &str, data: Bytes) -> Result<StoredObject, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &data).await?;

        tracing::debug!("Stored object {path} ({} bytes)", data.len());
        Ok(StoredObject {
            path: path.to_string(),
            url: format!("{}/{path}", self.base_url),
        })
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reduce a user-supplied name to a single safe path segment.
pub fn sanitize_segment(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `files/{client}/{project}/{millis}_{filename}`
pub fn file_path(client_name: &str, project_name: &str, millis: i64, filename: &str) -> String {
    format!(
        "files/{}/{}/{millis}_{}",
        sanitize_segment(client_name),
        sanitize_segment(project_name),
        sanitize_segment(filename)
    )
}

pub fn avatar_path(user_id: &str) -> String {
    format!("avatars/{}", sanitize_segment(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_separators_and_parent_refs() {
        assert_eq!(sanitize_segment("../etc/passwd"), "_etc_passwd");
        assert_eq!(sanitize_segment("Acme Corp"), "Acme_Corp");
        assert_eq!(sanitize_segment(".."), "_");
        assert_eq!(sanitize_segment(""), "_");
        assert_eq!(sanitize_segment("report.v2.pdf"), "report.v2.pdf");
    }

    #[test]
    fn file_path_layout() {
        assert_eq!(
            file_path("Acme", "Web site", 1700000000000, "brief.pdf"),
            "files/Acme/Web_site/1700000000000_brief.pdf"
        );
        assert_eq!(avatar_path("u/1"), "avatars/u_1");
    }

    #[tokio::test]
    async fn local_storage_round_trip() {
        let root = std::env::temp_dir().join(format!("shifter-storage-{}", uuid::Uuid::now_v7()));
        let storage = LocalObjectStorage::new(&root, "http://localhost/storage/");

        let stored = storage
            .put("avatars/u1", Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert_eq!(stored.url, "http://localhost/storage/avatars/u1");
        assert_eq!(tokio::fs::read(root.join("avatars/u1")).await.unwrap(), b"png");

        storage.delete("avatars/u1").await.unwrap();
        storage.delete("avatars/u1").await.unwrap();
        assert!(storage.put("../escape", Bytes::new()).await.is_err());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
