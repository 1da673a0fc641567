use axum::Json;
use axum::extract::{Path, State};

use super::{StatusBody, delete_in_scope, find_in_scope, owner_scope, validation};
use crate::auth::extractor::AuthUser;
use crate::auth::permissions::{Action, Resource};
use crate::error::AppError;
use crate::models::{Project, ProjectInput, ProjectPatch, ProjectStatus, UserRole};
use crate::repo::Scope;
use crate::state::SharedState;

/// Clients see the projects run for them; everyone else what they own.
pub fn project_scope(auth: &AuthUser) -> Scope {
    if auth.role() == UserRole::Client {
        Scope::by("clientId", auth.id())
    } else {
        owner_scope(auth)
    }
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Project>>, AppError> {
    auth.require(Resource::Projects, Action::Read)?;
    Ok(Json(state.repo::<Project>().list(&project_scope(&auth)).await))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<ProjectInput>,
) -> Result<Json<Project>, AppError> {
    auth.require(Resource::Projects, Action::Create)?;
    validation::required(&req.name, "Project name")?;
    validation::optional_date(&req.start_date, "Start date")?;
    validation::optional_date(&req.end_date, "End date")?;
    if !req.budget.is_finite() || req.budget < 0.0 {
        return Err(AppError::BadRequest(
            "Budget must be a non-negative number".to_string(),
        ));
    }

    let project = state
        .repo::<Project>()
        .create(req, &Scope::by("ownerId", auth.id()))
        .await;
    tracing::info!("Project {} created by {}", project.id, auth.id());
    Ok(Json(project))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<ProjectPatch>,
) -> Result<Json<Project>, AppError> {
    auth.require(Resource::Projects, Action::Update)?;
    patch.validate()?;
    if let Some(name) = &patch.name {
        validation::required(name, "Project name")?;
    }

    let repo = state.repo::<Project>();
    let existing = find_in_scope(&repo, &id, &owner_scope(&auth)).await?;
    repo.update(&id, &patch).await;

    Ok(Json(repo.get(&id).await.unwrap_or(existing)))
}

pub async fn set_status(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<StatusBody<ProjectStatus>>,
) -> Result<Json<Project>, AppError> {
    auth.require(Resource::Projects, Action::Update)?;

    let repo = state.repo::<Project>();
    let mut project = find_in_scope(&repo, &id, &owner_scope(&auth)).await?;
    repo.set_status(&id, &req.status).await?;
    project.status = req.status;
    Ok(Json(project))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_removal(Resource::Projects)?;
    delete_in_scope(&state.repo::<Project>(), &id, &owner_scope(&auth)).await
}
