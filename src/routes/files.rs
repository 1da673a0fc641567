use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use serde::Deserialize;

use super::{find_in_scope, multipart, validation};
use crate::auth::extractor::AuthUser;
use crate::auth::permissions::{Action, Resource};
use crate::error::AppError;
use crate::models::FileItem;
use crate::notifications::{NewNotification, NotificationKind, Priority};
use crate::repo::Scope;
use crate::repo::files::{self, Upload};
use crate::state::SharedState;

fn file_scope(auth: &AuthUser) -> Scope {
    if auth.is_admin() {
        Scope::unscoped()
    } else {
        files::uploader_scope(auth.id())
    }
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<FileItem>>, AppError> {
    auth.require(Resource::Files, Action::Read)?;
    Ok(Json(state.repo::<FileItem>().list(&file_scope(&auth)).await))
}

/// `multipart/form-data` with a `file` part and `clientName`, `projectName`
/// and optional `clientId` fields.
pub async fn upload(
    auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<FileItem>, AppError> {
    auth.require(Resource::Files, Action::Create)?;

    let mut form = multipart::parse(&headers, body).await?;
    let part = form
        .take_file("file")
        .ok_or_else(|| AppError::BadRequest("A file is required".to_string()))?;

    let client_name = form.text("clientName").unwrap_or_default().to_string();
    let project_name = form.text("projectName").unwrap_or_default().to_string();
    validation::required(&client_name, "Client name")?;
    validation::required(&project_name, "Project name")?;

    let upload = Upload {
        filename: part.filename,
        data: part.data,
        mime_type: part.content_type,
        client_id: form.text("clientId").map(str::to_string),
        client_name,
        project_name,
    };

    let item = files::upload(
        &state.repo::<FileItem>(),
        state.storage.as_ref(),
        auth.id(),
        upload,
    )
    .await?;
    tracing::info!("File {} uploaded by {} ({} bytes)", item.id, auth.id(), item.size);
    Ok(Json(item))
}

#[derive(Deserialize)]
pub struct SharedBody {
    pub shared: bool,
}

pub async fn set_shared(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<SharedBody>,
) -> Result<Json<FileItem>, AppError> {
    auth.require(Resource::Files, Action::Update)?;

    let repo = state.repo::<FileItem>();
    let mut item = find_in_scope(&repo, &id, &file_scope(&auth)).await?;
    repo.set_status(&id, &req.shared).await?;
    item.shared = req.shared;

    if req.shared && !item.client_id.is_empty() {
        state.notifications.add(
            &item.client_id,
            NewNotification::new(
                NotificationKind::File,
                Priority::Medium,
                "New file shared",
                &format!("{} was shared with you", item.name),
            )
            .action_url(item.url.clone())
            .metadata(serde_json::json!({ "fileId": item.id })),
        );
    }

    Ok(Json(item))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_removal(Resource::Files)?;

    let repo = state.repo::<FileItem>();
    match find_in_scope(&repo, &id, &file_scope(&auth)).await {
        Ok(item) => files::remove(&repo, state.storage.as_ref(), &item).await,
        Err(AppError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }
    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
