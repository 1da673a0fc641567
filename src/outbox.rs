//! Queue of writes performed against the local cache while the remote store was
//! unreachable. Replayed in order by [`crate::sync::flush`].

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::cache::ListCache;
use crate::store::{Fields, server_timestamp};

pub const OUTBOX_KEY: &str = "shifter_outbox";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum OutboxOp {
    /// Insert under a store-assigned id; `id` on the entry is the local id.
    /// `stamps` are written with `at`, the client clock at creation.
    Create {
        fields: Fields,
        stamps: Vec<String>,
        at: String,
    },
    /// Create or replace under the entry's id.
    Put {
        fields: Fields,
        stamps: Vec<String>,
        at: String,
    },
    Update { fields: Fields },
    SetStatus { field: String, value: Value },
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    pub entry_id: String,
    pub collection: String,
    pub cache_key: String,
    pub id: String,
    #[serde(flatten)]
    pub op: OutboxOp,
    pub queued_at: String,
}

impl OutboxEntry {
    pub fn new(collection: &str, cache_key: &str, id: &str, op: OutboxOp) -> Self {
        Self {
            entry_id: Uuid::now_v7().simple().to_string(),
            collection: collection.to_string(),
            cache_key: cache_key.to_string(),
            id: id.to_string(),
            op,
            queued_at: server_timestamp(Utc::now()),
        }
    }
}

#[derive(Clone)]
pub struct Outbox {
    cache: ListCache,
}

impl Outbox {
    pub fn new(cache: ListCache) -> Self {
        Self { cache }
    }

    pub async fn push(&self, entry: OutboxEntry) {
        let record = match serde_json::to_value(&entry) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Dropping unserializable outbox entry for {}: {e}", entry.id);
                return;
            }
        };
        tracing::debug!(
            "Queued offline write for {}/{} ({})",
            entry.collection,
            entry.id,
            entry.entry_id
        );
        self.cache.modify(OUTBOX_KEY, |records| records.push(record)).await;
    }

    pub async fn entries(&self) -> Vec<OutboxEntry> {
        self.cache
            .load(OUTBOX_KEY)
            .await
            .into_iter()
            .filter_map(|record| serde_json::from_value(record).ok())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Ids in `collection` created locally whose create is still queued.
    pub async fn pending_creates(&self, collection: &str) -> HashSet<String> {
        self.entries()
            .await
            .into_iter()
            .filter(|entry| entry.collection == collection)
            .filter(|entry| matches!(entry.op, OutboxOp::Create { .. }))
            .map(|entry| entry.id)
            .collect()
    }

    /// Drop every queued write for a record that never reached the store.
    pub async fn discard(&self, collection: &str, id: &str) {
        self.cache
            .modify(OUTBOX_KEY, |records| {
                records.retain(|record| {
                    !(record.get("collection").and_then(Value::as_str) == Some(collection)
                        && record.get("id").and_then(Value::as_str) == Some(id))
                })
            })
            .await;
    }

    /// Remove processed entries and point the remaining ones at remote ids.
    pub async fn settle(&self, processed: &HashSet<String>, renames: &[(String, String)]) {
        self.cache
            .modify(OUTBOX_KEY, |records| {
                records.retain(|record| {
                    record
                        .get("entryId")
                        .and_then(Value::as_str)
                        .is_none_or(|entry_id| !processed.contains(entry_id))
                });
                for record in records.iter_mut() {
                    let Some(id) = record.get("id").and_then(Value::as_str) else {
                        continue;
                    };
                    if let Some((_, remote)) = renames.iter().find(|(local, _)| local == id) {
                        record["id"] = Value::String(remote.clone());
                    }
                }
            })
            .await;
    }
}
