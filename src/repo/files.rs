use bytes::Bytes;
use chrono::Utc;

use crate::error::AppError;
use crate::models::{FileInput, FileItem};
use crate::storage::{self, ObjectStorage};

use super::{Repository, Scope};

pub struct Upload {
    pub filename: String,
    pub data: Bytes,
    pub mime_type: Option<String>,
    pub client_id: Option<String>,
    pub client_name: String,
    pub project_name: String,
}

pub fn uploader_scope(user_id: &str) -> Scope {
    Scope::by("uploadedBy", user_id)
}

/// What a client sees in the portal: files for them that were shared.
pub fn portal_scope(client_id: &str) -> Scope {
    Scope::by("clientId", client_id).and("shared", true)
}

/// Store the object, then record its metadata. The record write follows the
/// usual fallback path; the object write does not.
pub async fn upload(
    repo: &Repository<FileItem>,
    storage: &dyn ObjectStorage,
    uploader: &str,
    upload: Upload,
) -> Result<FileItem, AppError> {
    if upload.filename.trim().is_empty() {
        return Err(AppError::BadRequest("File name is required".to_string()));
    }

    let path = storage::file_path(
        &upload.client_name,
        &upload.project_name,
        Utc::now().timestamp_millis(),
        &upload.filename,
    );
    let size = upload.data.len() as u64;
    let stored = storage.put(&path, upload.data).await?;

    let input = FileInput {
        name: upload.filename,
        size,
        client_id: upload.client_id,
        client_name: upload.client_name,
        project_name: upload.project_name,
        url: stored.url,
        storage_path: Some(stored.path),
        mime_type: upload.mime_type,
    };
    Ok(repo.create(input, &uploader_scope(uploader)).await)
}

/// Delete the record and, best effort, the stored object behind it.
pub async fn remove(repo: &Repository<FileItem>, storage: &dyn ObjectStorage, item: &FileItem) {
    repo.delete(&item.id).await;

    let Some(path) = &item.storage_path else {
        return;
    };
    if let Err(e) = storage.delete(path).await {
        tracing::warn!("Failed to delete stored object {path}: {e}");
    }
}
