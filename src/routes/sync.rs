use axum::Json;
use axum::extract::State;

use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::state::SharedState;
use crate::sync::{self, SyncReport};

/// Run a reconciliation pass now instead of waiting for the background loop.
pub async fn sync_now(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<SyncReport>, AppError> {
    tracing::debug!("Outbox sync requested by {}", auth.id());
    Ok(Json(sync::sync_now(&state).await))
}
