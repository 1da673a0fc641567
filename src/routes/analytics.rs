use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::analytics::{Analytics, AnalyticsScope, MAX_MONTHS, Overview};
use crate::auth::extractor::AuthUser;
use crate::auth::permissions::{Action, Resource};
use crate::error::AppError;
use crate::state::SharedState;

const DEFAULT_MONTHS: u32 = 6;

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    pub months: Option<u32>,
}

fn analytics_for(auth: &AuthUser, state: &SharedState) -> Analytics {
    let scope = if auth.is_admin() {
        AnalyticsScope::Global
    } else {
        AnalyticsScope::Account(auth.id().to_string())
    };
    Analytics::new(state.store.clone(), scope)
}

pub async fn overview(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Overview>, AppError> {
    auth.require(Resource::Analytics, Action::Read)?;

    let months = query.months.unwrap_or(DEFAULT_MONTHS);
    if months == 0 || months > MAX_MONTHS {
        return Err(AppError::BadRequest(format!(
            "months must be between 1 and {MAX_MONTHS}"
        )));
    }

    Ok(Json(analytics_for(&auth, &state).overview(months).await))
}

#[derive(Serialize)]
pub struct Counts {
    pub clients: u64,
    pub employees: u64,
    pub projects: u64,
    pub tasks: u64,
    pub invoices: u64,
    pub files: u64,
}

pub async fn counts(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Counts>, AppError> {
    auth.require(Resource::Analytics, Action::Read)?;

    let analytics = analytics_for(&auth, &state);
    let (clients, employees, projects, tasks, invoices, files) = tokio::join!(
        analytics.total_count("clients"),
        analytics.total_count("employees"),
        analytics.total_count("projects"),
        analytics.total_count("tasks"),
        analytics.total_count("invoices"),
        analytics.total_count("files"),
    );

    Ok(Json(Counts {
        clients,
        employees,
        projects,
        tasks,
        invoices,
        files,
    }))
}
