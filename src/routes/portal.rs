use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::auth::extractor::AuthUser;
use crate::auth::permissions::{Action, Resource};
use crate::error::AppError;
use crate::models::{FileItem, Invoice, Project, ProjectStatus};
use crate::repo::Scope;
use crate::repo::files::portal_scope;
use crate::state::SharedState;

pub async fn files(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<FileItem>>, AppError> {
    auth.require(Resource::Files, Action::Read)?;
    Ok(Json(
        state.repo::<FileItem>().list(&portal_scope(auth.id())).await,
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSummary {
    pub total_invoiced: f64,
    pub active_projects: usize,
    pub shared_files: usize,
}

#[derive(Serialize)]
pub struct Portal {
    pub summary: PortalSummary,
    pub invoices: Vec<Invoice>,
    pub projects: Vec<Project>,
    pub files: Vec<FileItem>,
}

/// Everything the caller's portal shows, fetched concurrently.
pub async fn overview(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Portal>, AppError> {
    auth.require(Resource::Projects, Action::Read)?;

    let invoice_repo = state.repo::<Invoice>();
    let project_repo = state.repo::<Project>();
    let file_repo = state.repo::<FileItem>();
    let invoice_scope = Scope::by("employeeId", auth.id());
    let project_scope = Scope::by("clientId", auth.id());
    let file_scope = portal_scope(auth.id());

    let (invoices, projects, files) = tokio::join!(
        invoice_repo.list(&invoice_scope),
        project_repo.list(&project_scope),
        file_repo.list(&file_scope),
    );

    let summary = PortalSummary {
        total_invoiced: invoices.iter().map(|i| i.amount).sum(),
        active_projects: projects
            .iter()
            .filter(|p| p.status != ProjectStatus::Completed)
            .count(),
        shared_files: files.len(),
    };

    Ok(Json(Portal {
        summary,
        invoices,
        projects,
        files,
    }))
}
