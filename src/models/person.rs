use std::fmt::Debug;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, lenient_string, to_field};
use crate::repo::{CreateContext, Entity};
use crate::store::Fields;

/// Distinguishes the two person collections that share one shape.
pub trait PersonKind: Debug + Default + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const CACHE_KEY: &'static str;
    /// Path segment of the portal link, followed by the creation millis.
    const PORTAL_PREFIX: &'static str;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClientKind;

impl PersonKind for ClientKind {
    const COLLECTION: &'static str = "clients";
    const CACHE_KEY: &'static str = "shifter_clients";
    const PORTAL_PREFIX: &'static str = "client";
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmployeeKind;

impl PersonKind for EmployeeKind {
    const COLLECTION: &'static str = "employees";
    const CACHE_KEY: &'static str = "shifter_employees";
    const PORTAL_PREFIX: &'static str = "employee";
}

pub type Client = Person<ClientKind>;
pub type Employee = Person<EmployeeKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersonStatus {
    #[default]
    RequestSent,
    Active,
    Inactive,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, bound = "")]
pub struct Person<K: PersonKind> {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub owner_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(deserialize_with = "lenient_string")]
    pub company: String,
    #[serde(deserialize_with = "lenient_string")]
    pub portal_url: String,
    #[serde(deserialize_with = "lenient")]
    pub status: PersonStatus,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip)]
    kind: PhantomData<K>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl<K: PersonKind> Entity for Person<K> {
    const COLLECTION: &'static str = K::COLLECTION;
    const CACHE_KEY: &'static str = K::CACHE_KEY;

    type Input = PersonInput;
    type Patch = PersonPatch;
    type Status = PersonStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn new_fields(input: PersonInput, ctx: &CreateContext) -> Fields {
        let portal_url = format!(
            "{}/{}{}",
            ctx.portal_base_url,
            K::PORTAL_PREFIX,
            ctx.now.timestamp_millis()
        );

        let mut fields = Fields::new();
        fields.insert("name".into(), Value::String(input.name));
        fields.insert("email".into(), Value::String(input.email));
        fields.insert("phone".into(), Value::String(input.phone));
        fields.insert("company".into(), Value::String(input.company));
        fields.insert("portalUrl".into(), Value::String(portal_url));
        fields.insert("status".into(), to_field(&PersonStatus::RequestSent));
        fields
    }
}
