use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;

use super::{multipart, validation};
use crate::auth::extractor::AuthUser;
use crate::auth::permissions::{Action, Resource};
use crate::error::AppError;
use crate::models::{ProfilePatch, UserProfile, UserRole};
use crate::state::SharedState;
use crate::users;

pub async fn get(auth: AuthUser) -> Json<UserProfile> {
    Json(auth.profile)
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<UserProfile>, AppError> {
    auth.require(Resource::Settings, Action::Update)?;
    if let Some(name) = &patch.name {
        validation::required(name, "Name")?;
    }
    if let Some(email) = &patch.email {
        validation::email(email)?;
    }

    let profile = users::update_profile(
        &state.repo::<UserProfile>(),
        state.storage.as_ref(),
        &auth.profile,
        patch,
        None,
    )
    .await?;
    Ok(Json(profile))
}

#[derive(Deserialize)]
pub struct RoleBody {
    pub role: UserRole,
}

/// Callers pick their own role during onboarding; only admins hand out admin.
pub async fn set_role(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<RoleBody>,
) -> Result<Json<UserProfile>, AppError> {
    if req.role == UserRole::Admin {
        auth.require_admin()?;
    }
    let profile = users::update_role(&state.repo::<UserProfile>(), &auth.profile, req.role).await?;
    Ok(Json(profile))
}

pub async fn complete_onboarding(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Json<UserProfile> {
    Json(users::complete_onboarding(&state.repo::<UserProfile>(), &auth.profile).await)
}

/// `multipart/form-data` with an image in the `avatar` part.
pub async fn upload_avatar(
    auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UserProfile>, AppError> {
    auth.require(Resource::Settings, Action::Update)?;

    let mut form = multipart::parse(&headers, body).await?;
    let part = form
        .take_file("avatar")
        .ok_or_else(|| AppError::BadRequest("An avatar image is required".to_string()))?;
    if !part
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"))
    {
        return Err(AppError::BadRequest("Avatar must be an image".to_string()));
    }

    let profile = users::update_profile(
        &state.repo::<UserProfile>(),
        state.storage.as_ref(),
        &auth.profile,
        ProfilePatch::default(),
        Some(part.data),
    )
    .await?;
    tracing::info!("Avatar updated for {}", auth.id());
    Ok(Json(profile))
}
