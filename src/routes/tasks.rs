use axum::Json;
use axum::extract::{Path, State};

use super::{StatusBody, delete_in_scope, find_in_scope, owner_scope, validation};
use crate::auth::extractor::AuthUser;
use crate::auth::permissions::{Action, Resource};
use crate::error::AppError;
use crate::models::{Task, TaskInput, TaskPatch, TaskStatus};
use crate::notifications::{NewNotification, NotificationKind, Priority};
use crate::repo::{Scope, tasks};
use crate::state::SharedState;

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Task>>, AppError> {
    auth.require(Resource::Projects, Action::Read)?;
    let scope = tasks::list_scope(auth.role(), auth.id());
    Ok(Json(state.repo::<Task>().list(&scope).await))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<TaskInput>,
) -> Result<Json<Task>, AppError> {
    auth.require(Resource::Projects, Action::Create)?;
    validation::required(&req.title, "Title")?;
    validation::required(&req.project_id, "Project")?;
    validation::optional_date(&req.due_date, "Due date")?;

    let task = state
        .repo::<Task>()
        .create(req, &Scope::by("ownerId", auth.id()))
        .await;

    if !task.assignee_id.is_empty() && task.assignee_id != auth.id() {
        state.notifications.add(
            &task.assignee_id,
            NewNotification::new(
                NotificationKind::Project,
                Priority::Medium,
                "New task assigned",
                &format!("You have been assigned \"{}\"", task.title),
            )
            .metadata(serde_json::json!({ "taskId": task.id })),
        );
    }

    Ok(Json(task))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, AppError> {
    auth.require(Resource::Projects, Action::Update)?;
    if let Some(title) = &patch.title {
        validation::required(title, "Title")?;
    }
    if let Some(due) = &patch.due_date {
        validation::optional_date(due, "Due date")?;
    }

    let repo = state.repo::<Task>();
    let existing = find_in_scope(&repo, &id, &owner_scope(&auth)).await?;
    repo.update(&id, &patch).await;

    Ok(Json(repo.get(&id).await.unwrap_or(existing)))
}

pub async fn set_status(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<StatusBody<TaskStatus>>,
) -> Result<Json<Task>, AppError> {
    let task = tasks::change_status(&state.repo::<Task>(), auth.id(), &id, req.status).await?;
    Ok(Json(task))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_removal(Resource::Projects)?;
    delete_in_scope(&state.repo::<Task>(), &id, &owner_scope(&auth)).await
}
