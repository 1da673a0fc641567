//! Outbox reconciliation: replays writes made while the store was unreachable.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::cache::ListCache;
use crate::outbox::{Outbox, OutboxEntry, OutboxOp};
use crate::state::SharedState;
use crate::store::{DocumentStore, Fields, StoreError, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub replayed: usize,
    pub dropped: usize,
    pub pending: usize,
}

/// Replay queued writes in order. Stops at the first unavailable error and
/// keeps everything from that entry on for the next pass.
pub async fn flush(store: &dyn DocumentStore, cache: &ListCache) -> SyncReport {
    let outbox = Outbox::new(cache.clone());
    let entries = outbox.entries().await;

    let mut report = SyncReport::default();
    let mut processed = HashSet::new();
    let mut renames: Vec<(String, String)> = Vec::new();
    let mut orphaned: HashSet<String> = HashSet::new();

    for entry in entries {
        let id = renames
            .iter()
            .find(|(local, _)| *local == entry.id)
            .map(|(_, remote)| remote.clone())
            .unwrap_or_else(|| entry.id.clone());

        if orphaned.contains(&id) {
            tracing::warn!(
                "Dropping queued {} write for {}/{id}, its create was dropped",
                op_name(&entry.op),
                entry.collection
            );
            report.dropped += 1;
            processed.insert(entry.entry_id);
            continue;
        }

        let is_create = matches!(entry.op, OutboxOp::Create { .. });
        match replay(store, &entry, &id).await {
            Ok(Some(remote)) => {
                rename_cached(cache, &entry.cache_key, &id, &remote).await;
                tracing::debug!("Replayed create {}/{id} as {remote}", entry.collection);
                renames.push((id, remote));
                report.replayed += 1;
            }
            Ok(None) => report.replayed += 1,
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(
                    "Dropping queued {} write for missing {}/{id}",
                    op_name(&entry.op),
                    entry.collection
                );
                if is_create {
                    orphaned.insert(id.clone());
                }
                report.dropped += 1;
            }
            Err(e) if e.is_unavailable() => {
                tracing::debug!("Store still unavailable, sync paused: {e}");
                break;
            }
            Err(e) => {
                tracing::error!(
                    "Dropping queued {} write for {}/{id}: {e}",
                    op_name(&entry.op),
                    entry.collection
                );
                if is_create {
                    orphaned.insert(id.clone());
                }
                report.dropped += 1;
            }
        }
        processed.insert(entry.entry_id);
    }

    outbox.settle(&processed, &renames).await;
    report.pending = outbox.len().await;
    report
}

/// Returns the store-assigned id for replayed creates.
async fn replay(
    store: &dyn DocumentStore,
    entry: &OutboxEntry,
    id: &str,
) -> Result<Option<String>, StoreError> {
    let collection = entry.collection.as_str();
    match &entry.op {
        OutboxOp::Create { fields, stamps, at } => {
            let remote = store
                .insert(collection, stamped(fields.clone(), stamps, at))
                .await?;
            Ok(Some(remote))
        }
        OutboxOp::Put { fields, stamps, at } => {
            store.set(collection, id, stamped(fields.clone(), stamps, at)).await?;
            Ok(None)
        }
        OutboxOp::Update { fields } => {
            update(store, collection, id, fields.clone()).await?;
            Ok(None)
        }
        OutboxOp::SetStatus { field, value } => {
            let mut fields = Fields::new();
            fields.insert(field.clone(), value.clone());
            update(store, collection, id, fields).await?;
            Ok(None)
        }
        OutboxOp::Delete => {
            store.delete(collection, id).await?;
            Ok(None)
        }
    }
}

async fn update(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    fields: Fields,
) -> Result<(), StoreError> {
    store
        .update(collection, id, Write::new(fields).stamp("updatedAt"))
        .await
}

/// Timestamps of a replayed write keep the client clock of the original write.
fn stamped(mut fields: Fields, stamps: &[String], at: &str) -> Write {
    for field in stamps {
        fields.insert(field.clone(), Value::String(at.to_string()));
    }
    Write::new(fields)
}

fn op_name(op: &OutboxOp) -> &'static str {
    match op {
        OutboxOp::Create { .. } => "create",
        OutboxOp::Put { .. } => "put",
        OutboxOp::Update { .. } => "update",
        OutboxOp::SetStatus { .. } => "status",
        OutboxOp::Delete => "delete",
    }
}

async fn rename_cached(cache: &ListCache, key: &str, local: &str, remote: &str) {
    cache
        .modify(key, |records| {
            for record in records.iter_mut() {
                if record.get("id").and_then(Value::as_str) == Some(local) {
                    record["id"] = Value::String(remote.to_string());
                }
            }
        })
        .await;
}

/// One reconciliation pass, serialized against other passes.
pub async fn sync_now(state: &SharedState) -> SyncReport {
    let _guard = state.sync_lock.lock().await;
    let report = flush(state.store.as_ref(), &state.cache).await;
    if report.replayed > 0 || report.dropped > 0 {
        tracing::info!(
            "Outbox sync: {} replayed, {} dropped, {} pending",
            report.replayed,
            report.dropped,
            report.pending
        );
    }
    report
}

/// Background loop replaying the outbox every `sync_interval`.
pub async fn run(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("Outbox sync started (every {:?})", state.config.sync_interval);

    loop {
        if *shutdown.borrow() {
            break;
        }

        sync_now(&state).await;

        tokio::select! {
            _ = tokio::time::sleep(state.config.sync_interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::info!("Outbox sync stopped");
}
