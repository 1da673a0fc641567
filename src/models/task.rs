use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, lenient_string, to_field};
use crate::repo::{CreateContext, Entity};
use crate::store::Fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub project_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub assignee_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub assignee_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub owner_id: String,
    #[serde(deserialize_with = "lenient")]
    pub status: TaskStatus,
    #[serde(deserialize_with = "lenient_string")]
    pub due_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub assignee_id: String,
    #[serde(default)]
    pub assignee_name: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub due_date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl Entity for Task {
    const COLLECTION: &'static str = "tasks";
    const CACHE_KEY: &'static str = "shifter_tasks";

    type Input = TaskInput;
    type Patch = TaskPatch;
    type Status = TaskStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn new_fields(input: TaskInput, _ctx: &CreateContext) -> Fields {
        let mut fields = Fields::new();
        fields.insert("projectId".into(), Value::String(input.project_id));
        fields.insert("title".into(), Value::String(input.title));
        fields.insert("assigneeId".into(), Value::String(input.assignee_id));
        fields.insert("assigneeName".into(), Value::String(input.assignee_name));
        fields.insert("status".into(), to_field(&input.status.unwrap_or_default()));
        fields.insert("dueDate".into(), Value::String(input.due_date));
        fields
    }
}
