use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use serde_json::{Value, json};

use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::notifications::Notification;
use crate::state::SharedState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inbox {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

pub async fn list(auth: AuthUser, State(state): State<SharedState>) -> Json<Inbox> {
    Json(Inbox {
        notifications: state.notifications.list(auth.id()),
        unread_count: state.notifications.unread_count(auth.id()),
    })
}

pub async fn mark_read(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !state.notifications.mark_read(auth.id(), &id) {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(Json(json!({ "message": "Marked as read" })))
}

pub async fn mark_all_read(auth: AuthUser, State(state): State<SharedState>) -> Json<Value> {
    state.notifications.mark_all_read(auth.id());
    Json(json!({ "message": "All marked as read" }))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !state.notifications.remove(auth.id(), &id) {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(Json(json!({ "message": "Deleted" })))
}

pub async fn clear_all(auth: AuthUser, State(state): State<SharedState>) -> Json<Value> {
    state.notifications.clear_all(auth.id());
    Json(json!({ "message": "Deleted" }))
}
