use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, lenient_string, to_field};
use crate::repo::{CreateContext, Entity};
use crate::store::Fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    InProgress,
}

impl RequestStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::InProgress => "in progress",
        }
    }
}

/// A client's request for new work.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectRequest {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub project_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub budget: String,
    #[serde(deserialize_with = "lenient_string")]
    pub timeline: String,
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "lenient")]
    pub skills: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub additional_requirements: String,
    #[serde(deserialize_with = "lenient_string")]
    pub client_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub client_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub client_email: String,
    #[serde(deserialize_with = "lenient")]
    pub status: RequestStatus,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequestInput {
    pub project_name: String,
    pub description: String,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub additional_requirements: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequestPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
}

impl Entity for ProjectRequest {
    const COLLECTION: &'static str = "projectRequests";
    const CACHE_KEY: &'static str = "shifter_project_requests";

    type Input = ProjectRequestInput;
    type Patch = ProjectRequestPatch;
    type Status = RequestStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn new_fields(input: ProjectRequestInput, _ctx: &CreateContext) -> Fields {
        let mut fields = Fields::new();
        fields.insert("projectName".into(), Value::String(input.project_name));
        fields.insert("description".into(), Value::String(input.description));
        fields.insert("budget".into(), Value::String(input.budget));
        fields.insert("timeline".into(), Value::String(input.timeline));
        fields.insert("category".into(), Value::String(input.category));
        fields.insert("skills".into(), to_field(&input.skills));
        fields.insert(
            "additionalRequirements".into(),
            Value::String(input.additional_requirements),
        );
        fields.insert("clientName".into(), Value::String(input.client_name));
        fields.insert("clientEmail".into(), Value::String(input.client_email));
        fields.insert("status".into(), to_field(&RequestStatus::Pending));
        fields
    }
}
