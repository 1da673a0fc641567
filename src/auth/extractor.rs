use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::permissions::{self, Action, Resource};
use crate::error::AppError;
use crate::models::{UserProfile, UserRole};
use crate::state::SharedState;
use crate::users::{self, Identity};

pub const USER_ID_HEADER: &str = "x-shifter-user-id";
pub const USER_EMAIL_HEADER: &str = "x-shifter-user-email";
pub const USER_NAME_HEADER: &str = "x-shifter-user-name";

/// The authenticated caller and their profile document.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
    pub profile: UserProfile,
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn role(&self) -> UserRole {
        self.profile.role
    }

    pub fn is_admin(&self) -> bool {
        self.profile.role == UserRole::Admin
    }

    pub fn require(&self, resource: Resource, action: Action) -> Result<(), AppError> {
        if permissions::can(self.role(), resource, action) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Missing permission: {action} {resource}"
            )))
        }
    }

    /// Removing records from the caller's own scope only needs `update`;
    /// the `delete` grant covers everyone's records.
    pub fn require_removal(&self, resource: Resource) -> Result<(), AppError> {
        if permissions::can(self.role(), resource, Action::Delete) {
            return Ok(());
        }
        self.require(resource, Action::Update)
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    pub fn require_role(&self, role: UserRole) -> Result<(), AppError> {
        if self.role() == role {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("{role:?} access required")))
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, AppError> {
    match parts.headers.get(name) {
        Some(value) => value
            .to_str()
            .map(|s| Some(s.trim()))
            .map_err(|_| AppError::Unauthorized(format!("Invalid {name} header"))),
        None => Ok(None),
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_ID_HEADER)?
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing user identity".to_string()))?;
        if id.len() > 128 {
            return Err(AppError::Unauthorized("Invalid user identity".to_string()));
        }

        let identity = Identity {
            id: id.to_string(),
            email: header(parts, USER_EMAIL_HEADER)?.unwrap_or_default().to_string(),
            name: header(parts, USER_NAME_HEADER)?.unwrap_or_default().to_string(),
        };

        let profile = users::ensure_profile(&state.repo::<UserProfile>(), &identity).await;

        Ok(AuthUser { identity, profile })
    }
}
