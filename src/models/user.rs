use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, lenient_string, to_field};
use crate::auth::permissions::Permission;
use crate::repo::{CreateContext, Entity};
use crate::store::Fields;

/// Onboarding steps run from 1 to this value.
pub const ONBOARDING_FINAL_STEP: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Employer,
    Employee,
    #[default]
    Freelancer,
    Client,
}

/// Profile document kept alongside the auth identity, keyed by the same id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub permissions: Vec<Permission>,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub onboarding_completed: bool,
    #[serde(deserialize_with = "lenient")]
    pub onboarding_step: u8,
}

#[derive(Debug, Clone)]
pub struct ProfileInput {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_step: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

impl ProfilePatch {
    /// Apply the patch to an in-memory profile so callers can return the
    /// updated view without re-reading.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(name) = &self.name {
            profile.name = name.clone();
        }
        if let Some(email) = &self.email {
            profile.email = email.clone();
        }
        let optional = [
            (&self.phone, &mut profile.phone),
            (&self.company, &mut profile.company),
            (&self.bio, &mut profile.bio),
            (&self.website, &mut profile.website),
            (&self.location, &mut profile.location),
            (&self.avatar, &mut profile.avatar),
        ];
        for (patch, field) in optional {
            if let Some(value) = patch {
                *field = Some(value.clone());
            }
        }
        if let Some(done) = self.onboarding_completed {
            profile.onboarding_completed = done;
        }
        if let Some(step) = self.onboarding_step {
            profile.onboarding_step = step;
        }
    }
}

impl Entity for UserProfile {
    const COLLECTION: &'static str = "users";
    const CACHE_KEY: &'static str = "shifter_users";
    const SERVER_TIMESTAMPS: &'static [&'static str] = &["createdAt", "updatedAt", "lastLogin"];
    const OPTIONAL_DATE_FIELDS: &'static [&'static str] = &["updatedAt", "lastLogin"];
    const STATUS_FIELD: &'static str = "role";

    type Input = ProfileInput;
    type Patch = ProfilePatch;
    type Status = UserRole;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn new_fields(input: ProfileInput, _ctx: &CreateContext) -> Fields {
        let mut fields = Fields::new();
        fields.insert("email".into(), Value::String(input.email));
        fields.insert("name".into(), Value::String(input.name));
        fields.insert("role".into(), to_field(&UserRole::default()));
        fields.insert("permissions".into(), Value::Array(Vec::new()));
        fields.insert("onboardingCompleted".into(), Value::Bool(false));
        fields.insert("onboardingStep".into(), Value::from(1));
        fields
    }
}
