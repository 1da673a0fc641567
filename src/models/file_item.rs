use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, lenient_string, to_field};
use crate::repo::{CreateContext, Entity};
use crate::store::Fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    #[default]
    File,
    Folder,
}

/// Metadata of an uploaded object. `shared` controls portal visibility.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileItem {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub kind: FileKind,
    #[serde(deserialize_with = "lenient")]
    pub size: u64,
    #[serde(deserialize_with = "lenient_string")]
    pub uploaded_by: String,
    #[serde(deserialize_with = "lenient_string")]
    pub uploaded_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub client_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub client_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub project_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient")]
    pub shared: bool,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub storage_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub size: u64,
    pub client_id: Option<String>,
    pub client_name: String,
    pub project_name: String,
    pub url: String,
    pub storage_path: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl Entity for FileItem {
    const COLLECTION: &'static str = "files";
    const CACHE_KEY: &'static str = "shifter_files";
    const CREATED_FIELD: &'static str = "uploadedAt";
    const SERVER_TIMESTAMPS: &'static [&'static str] = &["uploadedAt"];
    const OPTIONAL_DATE_FIELDS: &'static [&'static str] = &[];
    const STATUS_FIELD: &'static str = "shared";

    type Input = FileInput;
    type Patch = FilePatch;
    type Status = bool;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> &str {
        &self.uploaded_at
    }

    fn new_fields(input: FileInput, _ctx: &CreateContext) -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".into(), Value::String(input.name));
        fields.insert("type".into(), to_field(&FileKind::File));
        fields.insert("size".into(), Value::from(input.size));
        fields.insert(
            "clientId".into(),
            Value::String(input.client_id.unwrap_or_default()),
        );
        fields.insert("clientName".into(), Value::String(input.client_name));
        fields.insert("projectName".into(), Value::String(input.project_name));
        fields.insert("url".into(), Value::String(input.url));
        fields.insert("shared".into(), Value::Bool(false));
        if let Some(path) = input.storage_path {
            fields.insert("storagePath".into(), Value::String(path));
        }
        if let Some(mime) = input.mime_type {
            fields.insert("mimeType".into(), Value::String(mime));
        }
        fields
    }
}
