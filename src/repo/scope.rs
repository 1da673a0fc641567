use serde_json::Value;

use crate::store::{Direction, Fields, Query};

/// Visibility filter for a list: every `(field, value)` pair must match.
///
/// The same pairs are written onto documents created through the scope, so a
/// record created in a scope is always listed by it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    filters: Vec<(String, Value)>,
}

impl Scope {
    /// No filtering. Reserved for privileged callers.
    pub fn unscoped() -> Self {
        Self::default()
    }

    pub fn by(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::unscoped().and(field, value)
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Whether a cached record (serialized entity) falls inside the scope.
    pub fn matches(&self, record: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| record.get(field) == Some(value))
    }

    pub fn apply(&self, fields: &mut Fields) {
        for (field, value) in &self.filters {
            fields.insert(field.clone(), value.clone());
        }
    }

    pub fn to_query(&self, order_field: &str) -> Query {
        self.filters
            .iter()
            .fold(Query::new(), |query, (field, value)| {
                query.where_eq(field.clone(), value.clone())
            })
            .order_by(order_field, Direction::Desc)
    }
}
