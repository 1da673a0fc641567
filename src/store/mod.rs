//! Remote document store boundary.
//!
//! Every entity collection lives in a [`DocumentStore`]: a schemaless store of
//! JSON documents addressed by `(collection, id)` that supports filtered and
//! ordered queries, server-assigned timestamps and push subscriptions of whole
//! query snapshots.

pub mod memory;
pub mod postgres;

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::stream::BoxStream;
use serde_json::{Map, Value};

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

pub type Fields = Map<String, Value>;

/// A stream of full query snapshots. Dropping it releases the remote listener.
pub type SnapshotStream = BoxStream<'static, Result<Vec<Document>, StoreError>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug)]
pub enum StoreError {
    /// The store could not be reached (network, pool, or an offline switch).
    Unavailable(String),
    NotFound(String),
    Database(sqlx::Error),
    Serialization(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {msg}"),
            StoreError::NotFound(msg) => write!(f, "Document not found: {msg}"),
            StoreError::Database(err) => write!(f, "Database error: {err}"),
            StoreError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Database(other),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Gte(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub condition: Condition,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            condition: Condition::Eq(value.into()),
        });
        self
    }

    pub fn where_gte(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            condition: Condition::Gte(value.into()),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Evaluate the filters against a document's fields.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|filter| {
            let Some(actual) = fields.get(&filter.field) else {
                return false;
            };
            match &filter.condition {
                Condition::Eq(expected) => actual == expected,
                Condition::Gte(bound) => compare_values(actual, bound) != Ordering::Less,
            }
        })
    }

    /// Stable sort by the order-by field; documents keep store order on ties.
    pub fn sort(&self, documents: &mut [Document]) {
        let Some((field, direction)) = &self.order_by else {
            return;
        };
        documents.sort_by(|a, b| {
            let ordering = match (a.fields.get(field), b.fields.get(field)) {
                (Some(x), Some(y)) => compare_values(x, y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        });
    }
}

/// Order two JSON values: numbers numerically, RFC 3339 timestamps
/// chronologically, everything else by its string form.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// A document write plus the fields the store must stamp with its own clock.
#[derive(Debug, Clone, Default)]
pub struct Write {
    pub fields: Fields,
    pub server_timestamps: Vec<String>,
}

impl Write {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            server_timestamps: Vec::new(),
        }
    }

    pub fn stamp(mut self, field: impl Into<String>) -> Self {
        self.server_timestamps.push(field.into());
        self
    }

    /// Materialize the write with the store clock.
    pub fn resolve(self) -> Fields {
        let now = server_timestamp(Utc::now());
        let mut fields = self.fields;
        for field in self.server_timestamps {
            fields.insert(field, Value::String(now.clone()));
        }
        fields
    }
}

/// Canonical timestamp representation inside documents. Fixed width, so
/// lexical order equals chronological order.
pub fn server_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert a new document and return its store-assigned id.
    async fn insert(&self, collection: &str, write: Write) -> Result<String, StoreError>;

    /// Create or replace a document under a caller-chosen id.
    async fn set(&self, collection: &str, id: &str, write: Write) -> Result<(), StoreError>;

    /// Merge fields into an existing document. `NotFound` if it does not exist.
    async fn update(&self, collection: &str, id: &str, write: Write) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn count(&self, collection: &str) -> Result<u64, StoreError>;

    /// Push the current snapshot of `query`, then a fresh snapshot after every
    /// change to the collection.
    async fn subscribe(&self, collection: &str, query: Query) -> Result<SnapshotStream, StoreError>;
}
