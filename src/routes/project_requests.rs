use axum::Json;
use axum::extract::{Path, State};

use super::{StatusBody, find_in_scope, validation};
use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::models::{ProjectRequest, ProjectRequestInput, RequestStatus, UserRole};
use crate::notifications::{NewNotification, NotificationKind, Priority};
use crate::repo::Scope;
use crate::state::SharedState;

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<ProjectRequest>>, AppError> {
    let scope = if auth.is_admin() {
        Scope::unscoped()
    } else {
        auth.require_role(UserRole::Client)?;
        Scope::by("clientId", auth.id())
    };
    Ok(Json(state.repo::<ProjectRequest>().list(&scope).await))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(mut req): Json<ProjectRequestInput>,
) -> Result<Json<ProjectRequest>, AppError> {
    auth.require_role(UserRole::Client)?;
    validation::required(&req.project_name, "Project name")?;
    validation::required(&req.description, "Description")?;

    if req.client_name.trim().is_empty() {
        req.client_name = auth.profile.name.clone();
    }
    if req.client_email.trim().is_empty() {
        req.client_email = auth.identity.email.clone();
    }

    let request = state
        .repo::<ProjectRequest>()
        .create(req, &Scope::by("clientId", auth.id()))
        .await;
    tracing::info!("Project request {} submitted by {}", request.id, auth.id());
    Ok(Json(request))
}

pub async fn set_status(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<StatusBody<RequestStatus>>,
) -> Result<Json<ProjectRequest>, AppError> {
    auth.require_admin()?;

    let repo = state.repo::<ProjectRequest>();
    let mut request = find_in_scope(&repo, &id, &Scope::unscoped()).await?;
    repo.set_status(&id, &req.status).await?;
    request.status = req.status;

    if !request.client_id.is_empty() {
        state.notifications.add(
            &request.client_id,
            NewNotification::new(
                NotificationKind::Project,
                Priority::Medium,
                "Project request updated",
                &format!(
                    "Your request \"{}\" is now {}",
                    request.project_name,
                    req.status.label()
                ),
            )
            .metadata(serde_json::json!({ "requestId": request.id })),
        );
    }

    Ok(Json(request))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;
    state.repo::<ProjectRequest>().delete(&id).await;
    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
