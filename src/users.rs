//! User profile documents kept alongside the auth identity.

use bytes::Bytes;

use crate::error::AppError;
use crate::models::user::ONBOARDING_FINAL_STEP;
use crate::models::{ProfileInput, ProfilePatch, UserProfile, UserRole};
use crate::repo::Repository;
use crate::repo::record;
use crate::storage::{self, ObjectStorage};

/// Identity asserted by the upstream auth gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Fetch the caller's profile, creating it on first sight.
///
/// When the store is unreachable the cached profile is used, or a default
/// profile that is returned but never persisted.
pub async fn ensure_profile(repo: &Repository<UserProfile>, identity: &Identity) -> UserProfile {
    match repo.get_remote(&identity.id).await {
        Ok(Some(mut profile)) => {
            let today = record::today();
            if profile.last_login.as_deref() != Some(today.as_str()) {
                let patch = ProfilePatch {
                    last_login: Some(today.clone()),
                    ..Default::default()
                };
                repo.update(&identity.id, &patch).await;
                profile.last_login = Some(today);
            }
            repo.remember(&profile).await;
            profile
        }
        Ok(None) => {
            tracing::info!("Creating profile for {}", identity.id);
            let input = ProfileInput {
                email: identity.email.clone(),
                name: identity.name.clone(),
            };
            repo.put(&identity.id, input).await
        }
        Err(e) => {
            tracing::warn!("Error fetching profile {}, using local cache: {e}", identity.id);
            match repo.cached_by_id(&identity.id).await {
                Some(profile) => profile,
                None => transient_profile(identity),
            }
        }
    }
}

fn transient_profile(identity: &Identity) -> UserProfile {
    UserProfile {
        id: identity.id.clone(),
        email: identity.email.clone(),
        name: identity.name.clone(),
        role: UserRole::default(),
        onboarding_step: 1,
        created_at: record::today(),
        ..Default::default()
    }
}

pub async fn update_role(
    repo: &Repository<UserProfile>,
    profile: &UserProfile,
    role: UserRole,
) -> Result<UserProfile, AppError> {
    repo.set_status(&profile.id, &role).await?;
    tracing::info!("Profile {} role set to {role:?}", profile.id);
    Ok(UserProfile {
        role,
        ..profile.clone()
    })
}

pub async fn complete_onboarding(
    repo: &Repository<UserProfile>,
    profile: &UserProfile,
) -> UserProfile {
    let patch = ProfilePatch {
        onboarding_completed: Some(true),
        onboarding_step: Some(ONBOARDING_FINAL_STEP),
        ..Default::default()
    };
    repo.update(&profile.id, &patch).await;

    let mut updated = profile.clone();
    patch.apply_to(&mut updated);
    updated
}

/// Apply profile edits, uploading a new avatar first when one is given.
pub async fn update_profile(
    repo: &Repository<UserProfile>,
    storage: &dyn ObjectStorage,
    profile: &UserProfile,
    mut patch: ProfilePatch,
    avatar: Option<Bytes>,
) -> Result<UserProfile, AppError> {
    // Bookkeeping fields are owned by the service.
    patch.onboarding_completed = None;
    patch.onboarding_step = None;
    patch.last_login = None;

    if let Some(data) = avatar {
        let stored = storage.put(&storage::avatar_path(&profile.id), data).await?;
        patch.avatar = Some(stored.url);
    }

    repo.update(&profile.id, &patch).await;

    let mut updated = profile.clone();
    patch.apply_to(&mut updated);
    Ok(updated)
}
