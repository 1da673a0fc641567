//! Conversions between remote documents, cached records and entities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::Entity;
use crate::store::{Document, Fields};

/// Prefix marking ids minted locally while the remote store was unreachable.
pub const LOCAL_ID_PREFIX: &str = "local-";

pub fn local_id() -> String {
    format!("{LOCAL_ID_PREFIX}{}", Uuid::now_v7().simple())
}

pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

pub fn date_string(at: DateTime<Utc>) -> String {
    at.date_naive().format("%Y-%m-%d").to_string()
}

pub fn today() -> String {
    date_string(Utc::now())
}

/// Read a stored timestamp as a `YYYY-MM-DD` date string.
///
/// Accepts RFC 3339 timestamps, plain dates and epoch milliseconds.
pub fn materialize_date(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| date_string(dt.with_timezone(&Utc)))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .map(|d| d.format("%Y-%m-%d").to_string())
            }),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(date_string),
        _ => None,
    }
}

/// Parse a stored timestamp for bucketing. Plain dates count as midnight UTC.
pub fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            }),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Serialize a value into a field map, dropping `null`s (unset patch fields).
pub fn fields_of<T: Serialize>(value: &T) -> Fields {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        Ok(_) => Fields::new(),
        Err(e) => {
            tracing::warn!("Failed to serialize fields: {e}");
            Fields::new()
        }
    }
}

pub fn to_record<E: Entity>(entity: &E) -> Value {
    serde_json::to_value(entity).unwrap_or_else(|e| {
        tracing::warn!("Failed to serialize {} record: {e}", E::COLLECTION);
        Value::Null
    })
}

pub fn from_record<E: Entity>(record: &Value) -> Option<E> {
    match serde_json::from_value(record.clone()) {
        Ok(entity) => Some(entity),
        Err(e) => {
            tracing::debug!("Skipping unreadable cached {} record: {e}", E::COLLECTION);
            None
        }
    }
}

pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Build an entity from a remote document, tolerating missing or malformed
/// fields. The creation date defaults to today.
pub fn from_document<E: Entity>(doc: &Document) -> E {
    let mut fields = doc.fields.clone();
    fields.insert("id".to_string(), Value::String(doc.id.clone()));

    let created = materialize_date(fields.get(E::CREATED_FIELD)).unwrap_or_else(today);
    fields.insert(E::CREATED_FIELD.to_string(), Value::String(created));

    for field in E::OPTIONAL_DATE_FIELDS {
        match materialize_date(fields.get(*field)) {
            Some(date) => {
                fields.insert(field.to_string(), Value::String(date));
            }
            None => {
                fields.remove(*field);
            }
        }
    }

    match serde_json::from_value(Value::Object(fields)) {
        Ok(entity) => entity,
        Err(e) => {
            tracing::warn!("Malformed {} document {}: {e}", E::COLLECTION, doc.id);
            let mut entity = E::default();
            entity.set_id(doc.id.clone());
            entity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn materializes_rfc3339_as_utc_date() {
        let value = json!("2024-03-01T23:30:00-02:00");
        assert_eq!(materialize_date(Some(&value)).as_deref(), Some("2024-03-02"));
    }

    #[test]
    fn materializes_plain_dates_and_millis() {
        assert_eq!(
            materialize_date(Some(&json!("2024-03-01"))).as_deref(),
            Some("2024-03-01")
        );
        assert_eq!(
            materialize_date(Some(&json!(1_709_251_200_000_i64))).as_deref(),
            Some("2024-03-01")
        );
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert!(materialize_date(Some(&json!("soon"))).is_none());
        assert!(materialize_date(Some(&json!({}))).is_none());
        assert!(materialize_date(None).is_none());
    }

    #[test]
    fn local_ids_are_recognizable() {
        let id = local_id();
        assert!(is_local_id(&id));
        assert!(!is_local_id("0190a0b1c2d3"));
    }

    #[test]
    fn fields_of_drops_nulls() {
        let fields = fields_of(&json!({ "name": "x", "email": null }));
        assert!(fields.contains_key("name"));
        assert!(!fields.contains_key("email"));
    }
}
