pub mod analytics;
pub mod files;
pub mod invoices;
pub mod live;
pub mod multipart;
pub mod notifications;
pub mod people;
pub mod portal;
pub mod profile;
pub mod project_requests;
pub mod projects;
pub mod sync;
pub mod tasks;
pub mod validation;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::models::{ClientKind, EmployeeKind};
use crate::repo::record::to_record;
use crate::repo::{Entity, Repository, Scope};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct StatusBody<S> {
    pub status: S,
}

/// Admins see every record; everyone else sees what they own.
pub fn owner_scope(auth: &AuthUser) -> Scope {
    if auth.is_admin() {
        Scope::unscoped()
    } else {
        Scope::by("ownerId", auth.id())
    }
}

/// Load a record, refusing records outside `scope`.
pub async fn find_in_scope<E: Entity>(
    repo: &Repository<E>,
    id: &str,
    scope: &Scope,
) -> Result<E, AppError> {
    let entity = repo
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;
    if !scope.matches(&to_record(&entity)) {
        return Err(AppError::Forbidden("Record belongs to another account".to_string()));
    }
    Ok(entity)
}

/// Delete a record inside `scope`. Deleting a missing record succeeds.
pub async fn delete_in_scope<E: Entity>(
    repo: &Repository<E>,
    id: &str,
    scope: &Scope,
) -> Result<Json<Value>, AppError> {
    match find_in_scope(repo, id, scope).await {
        Ok(_) => repo.delete(id).await,
        Err(AppError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }
    Ok(Json(json!({ "message": "Deleted" })))
}

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Clients
        .route(
            "/api/v1/clients",
            get(people::list::<ClientKind>).post(people::create::<ClientKind>),
        )
        .route(
            "/api/v1/clients/{id}",
            put(people::update::<ClientKind>).delete(people::delete::<ClientKind>),
        )
        .route(
            "/api/v1/clients/{id}/status",
            put(people::set_status::<ClientKind>),
        )
        // Employees
        .route(
            "/api/v1/employees",
            get(people::list::<EmployeeKind>).post(people::create::<EmployeeKind>),
        )
        .route(
            "/api/v1/employees/{id}",
            put(people::update::<EmployeeKind>).delete(people::delete::<EmployeeKind>),
        )
        .route(
            "/api/v1/employees/{id}/status",
            put(people::set_status::<EmployeeKind>),
        )
        // Projects
        .route("/api/v1/projects", get(projects::list).post(projects::create))
        .route("/api/v1/projects/live", get(live::projects))
        .route(
            "/api/v1/projects/{id}",
            put(projects::update).delete(projects::delete),
        )
        .route("/api/v1/projects/{id}/status", put(projects::set_status))
        // Tasks
        .route("/api/v1/tasks", get(tasks::list).post(tasks::create))
        .route("/api/v1/tasks/live", get(live::tasks))
        .route("/api/v1/tasks/{id}", put(tasks::update).delete(tasks::delete))
        .route("/api/v1/tasks/{id}/status", put(tasks::set_status))
        // Invoices
        .route("/api/v1/invoices", get(invoices::list).post(invoices::create))
        .route(
            "/api/v1/invoices/{id}",
            axum::routing::delete(invoices::delete),
        )
        .route("/api/v1/invoices/{id}/status", put(invoices::set_status))
        .route(
            "/api/v1/invoices/{id}/payment-intent",
            post(invoices::payment_intent),
        )
        .route("/api/v1/invoices/{id}/payment", post(invoices::payment))
        // Project requests
        .route(
            "/api/v1/project-requests",
            get(project_requests::list).post(project_requests::create),
        )
        .route(
            "/api/v1/project-requests/{id}",
            axum::routing::delete(project_requests::delete),
        )
        .route(
            "/api/v1/project-requests/{id}/status",
            put(project_requests::set_status),
        )
        // Files
        .route("/api/v1/files", get(files::list).post(files::upload))
        .route("/api/v1/files/{id}", axum::routing::delete(files::delete))
        .route("/api/v1/files/{id}/shared", put(files::set_shared))
        // Client portal
        .route("/api/v1/portal", get(portal::overview))
        .route("/api/v1/portal/files", get(portal::files))
        // Analytics
        .route("/api/v1/analytics", get(analytics::overview))
        .route("/api/v1/analytics/counts", get(analytics::counts))
        // Profile
        .route("/api/v1/profile", get(profile::get).put(profile::update))
        .route("/api/v1/profile/role", put(profile::set_role))
        .route(
            "/api/v1/profile/onboarding/complete",
            post(profile::complete_onboarding),
        )
        .route("/api/v1/profile/avatar", put(profile::upload_avatar))
        // Notifications
        .route(
            "/api/v1/notifications",
            get(notifications::list).delete(notifications::clear_all),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .route(
            "/api/v1/notifications/{id}",
            axum::routing::delete(notifications::delete),
        )
        .route(
            "/api/v1/notifications/{id}/read",
            post(notifications::mark_read),
        )
        // Sync
        .route("/api/v1/sync", post(sync::sync_now))
}
