pub mod file_item;
pub mod invoice;
pub mod person;
pub mod project;
pub mod project_request;
pub mod task;
pub mod user;

pub use file_item::{FileInput, FileItem, FileKind, FilePatch};
pub use invoice::{Invoice, InvoiceInput, InvoicePatch, InvoiceStatus};
pub use person::{
    Client, ClientKind, Employee, EmployeeKind, Person, PersonInput, PersonKind, PersonPatch,
    PersonStatus,
};
pub use project::{Project, ProjectInput, ProjectPatch, ProjectStatus};
pub use project_request::{
    ProjectRequest, ProjectRequestInput, ProjectRequestPatch, RequestStatus,
};
pub use task::{Task, TaskInput, TaskPatch, TaskStatus};
pub use user::{ProfileInput, ProfilePatch, UserProfile, UserRole};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Serialize a typed value into a document field.
pub(crate) fn to_field<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Deserialize a field, falling back to its default when the stored value has
/// the wrong shape. Remote documents may be partially written.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Like [`lenient`] for strings: `null` and non-strings become empty.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}
