use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{lenient, lenient_string, to_field};
use crate::error::AppError;
use crate::repo::{CreateContext, Entity};
use crate::store::Fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    InProgress,
    Review,
    Completed,
    OnHold,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub client_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub client_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient")]
    pub status: ProjectStatus,
    #[serde(deserialize_with = "lenient_string")]
    pub start_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub end_date: String,
    #[serde(deserialize_with = "lenient_progress")]
    pub progress: u8,
    #[serde(deserialize_with = "lenient")]
    pub budget: f64,
    #[serde(deserialize_with = "lenient")]
    pub team_members: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub owner_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub name: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub team_members: Vec<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub progress: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_members: Option<Vec<String>>,
}

impl ProjectPatch {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.progress.is_some_and(|p| !(0..=100).contains(&p)) {
            return Err(AppError::BadRequest(
                "Progress must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn clamp_progress(progress: i64) -> u8 {
    progress.clamp(0, 100) as u8
}

fn lenient_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_f64()
        .map(|p| clamp_progress(p.round() as i64))
        .unwrap_or(0))
}

impl Entity for Project {
    const COLLECTION: &'static str = "projects";
    const CACHE_KEY: &'static str = "shifter_projects";

    type Input = ProjectInput;
    type Patch = ProjectPatch;
    type Status = ProjectStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn new_fields(input: ProjectInput, _ctx: &CreateContext) -> Fields {
        let mut fields = Fields::new();
        if let Some(client_id) = input.client_id.filter(|id| !id.is_empty()) {
            fields.insert("clientId".into(), Value::String(client_id));
        }
        fields.insert("name".into(), Value::String(input.name));
        fields.insert("clientName".into(), Value::String(input.client_name));
        fields.insert("description".into(), Value::String(input.description));
        fields.insert("startDate".into(), Value::String(input.start_date));
        fields.insert("endDate".into(), Value::String(input.end_date));
        fields.insert("budget".into(), to_field(&input.budget));
        fields.insert("teamMembers".into(), to_field(&input.team_members));
        fields.insert(
            "status".into(),
            to_field(&input.status.unwrap_or_default()),
        );
        fields.insert(
            "progress".into(),
            Value::from(clamp_progress(input.progress.unwrap_or(0))),
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Document;
    use chrono::Utc;
    use serde_json::json;

    fn input(progress: Option<i64>) -> ProjectInput {
        ProjectInput {
            name: "Site".into(),
            client_id: None,
            client_name: "Acme".into(),
            description: String::new(),
            start_date: "2024-01-01".into(),
            end_date: "2024-06-01".into(),
            budget: 1200.0,
            team_members: vec![],
            status: None,
            progress,
        }
    }

    #[test]
    fn create_defaults_status_and_clamps_progress() {
        let ctx = CreateContext {
            now: Utc::now(),
            portal_base_url: String::new(),
        };
        let fields = Project::new_fields(input(Some(140)), &ctx);
        assert_eq!(fields["status"], "planning");
        assert_eq!(fields["progress"], 100);
        assert!(!fields.contains_key("clientId"));

        let fields = Project::new_fields(input(Some(-3)), &ctx);
        assert_eq!(fields["progress"], 0);
    }

    #[test]
    fn patch_rejects_out_of_range_progress() {
        let patch = ProjectPatch {
            progress: Some(101),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        let patch = ProjectPatch {
            progress: Some(55),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn stored_progress_is_clamped_on_read() {
        let doc = Document {
            id: "p1".into(),
            fields: json!({ "progress": 250.4, "status": "on-hold", "teamMembers": "bob" })
                .as_object()
                .cloned()
                .unwrap(),
        };
        let project = Project::from_document(&doc);
        assert_eq!(project.progress, 100);
        assert_eq!(project.status, ProjectStatus::OnHold);
        assert!(project.team_members.is_empty());
    }
}
