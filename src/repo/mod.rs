//! Offline-resilient repositories.
//!
//! [`Repository`] implements list / get / create / update / delete / set-status
//! for any [`Entity`]. Every operation goes to the remote [`DocumentStore`]
//! first and mirrors the result into the local [`ListCache`]. When the store
//! fails, the operation is applied to the cache alone (and queued in the
//! [`Outbox`] when the store was unreachable), so callers never see a remote
//! failure.

pub mod files;
pub mod record;
pub mod scope;
pub mod tasks;

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::ListCache;
use crate::error::AppError;
use crate::outbox::{Outbox, OutboxEntry, OutboxOp};
use crate::store::{Document, DocumentStore, Fields, StoreError, Write};

pub use record::{is_local_id, local_id};
pub use scope::Scope;

/// Values a new document may derive from the moment and place it was created.
#[derive(Debug, Clone)]
pub struct CreateContext {
    pub now: DateTime<Utc>,
    pub portal_base_url: String,
}

pub trait Entity: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    /// Remote collection name.
    const COLLECTION: &'static str;
    /// Local cache key holding the whole record list for this type.
    const CACHE_KEY: &'static str;
    /// Creation timestamp field; lists are ordered by it, newest first.
    const CREATED_FIELD: &'static str = "createdAt";
    /// Fields the store stamps on insert.
    const SERVER_TIMESTAMPS: &'static [&'static str] = &["createdAt", "updatedAt"];
    /// Date fields kept only when present and readable.
    const OPTIONAL_DATE_FIELDS: &'static [&'static str] = &["updatedAt"];
    /// Field written by [`Repository::set_status`].
    const STATUS_FIELD: &'static str = "status";

    type Input: Send;
    type Patch: Serialize + Send + Sync;
    type Status: Serialize + Clone + Send + Sync;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    /// Creation date as `YYYY-MM-DD`.
    fn created_at(&self) -> &str;

    /// Document fields for a new record, before scope fields and timestamps.
    fn new_fields(input: Self::Input, ctx: &CreateContext) -> Fields;

    /// Reject statuses that must not be set directly.
    fn validate_status(_status: &Self::Status) -> Result<(), AppError> {
        Ok(())
    }

    fn from_document(doc: &Document) -> Self {
        record::from_document(doc)
    }
}

pub struct Repository<E: Entity> {
    store: Arc<dyn DocumentStore>,
    cache: ListCache,
    outbox: Outbox,
    portal_base_url: Arc<str>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            outbox: self.outbox.clone(),
            portal_base_url: self.portal_base_url.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn DocumentStore>, cache: ListCache) -> Self {
        Self {
            store,
            outbox: Outbox::new(cache.clone()),
            cache,
            portal_base_url: Arc::from("https://shifter.com/portal"),
            _entity: PhantomData,
        }
    }

    pub fn with_portal_base_url(mut self, url: &str) -> Self {
        self.portal_base_url = Arc::from(url.trim_end_matches('/'));
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Records visible in `scope`, newest first. Never fails.
    pub async fn list(&self, scope: &Scope) -> Vec<E> {
        let query = scope.to_query(E::CREATED_FIELD);
        match self.store.query(E::COLLECTION, &query).await {
            Ok(documents) => {
                let remote: Vec<E> = documents.iter().map(E::from_document).collect();
                let pending = self.refresh_mirror(scope, &remote).await;

                let mut items = pending;
                items.extend(remote);
                sort_newest_first(&mut items);
                items
            }
            Err(e) => {
                tracing::warn!("Error fetching {}, using local cache: {e}", E::COLLECTION);
                self.cached(scope).await
            }
        }
    }

    /// Local cache contents for `scope`, newest first.
    pub async fn cached(&self, scope: &Scope) -> Vec<E> {
        let mut items: Vec<E> = self
            .cache
            .load(E::CACHE_KEY)
            .await
            .iter()
            .filter(|record| scope.matches(record))
            .filter_map(record::from_record)
            .collect();
        sort_newest_first(&mut items);
        items
    }

    pub async fn get(&self, id: &str) -> Option<E> {
        if self.is_pending_create(id).await {
            return self.cached_by_id(id).await;
        }
        match self.get_remote(id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Error fetching {}/{id}, using local cache: {e}", E::COLLECTION);
                self.cached_by_id(id).await
            }
        }
    }

    /// Remote lookup without cache fallback, for callers that must tell a
    /// missing record apart from an unreachable store.
    pub async fn get_remote(&self, id: &str) -> Result<Option<E>, StoreError> {
        Ok(self
            .store
            .get(E::COLLECTION, id)
            .await?
            .map(|doc| E::from_document(&doc)))
    }

    pub async fn cached_by_id(&self, id: &str) -> Option<E> {
        self.cache
            .load(E::CACHE_KEY)
            .await
            .iter()
            .find(|record| record::record_id(record) == Some(id))
            .and_then(record::from_record)
    }

    /// Create a record in `scope`. The returned entity has the same shape
    /// whether it reached the store or only the local cache.
    pub async fn create(&self, input: E::Input, scope: &Scope) -> E {
        let ctx = self.context();
        let mut fields = E::new_fields(input, &ctx);
        scope.apply(&mut fields);

        let write = stamped::<E>(Write::new(fields.clone()));
        match self.store.insert(E::COLLECTION, write).await {
            Ok(id) => {
                let entity = materialize::<E>(id, fields, ctx.now);
                self.mirror_insert(&entity).await;
                entity
            }
            Err(e) => {
                tracing::warn!("Error adding {}, storing locally: {e}", E::COLLECTION);
                let id = local_id();
                let entity = materialize::<E>(id.clone(), fields.clone(), ctx.now);
                self.mirror_insert(&entity).await;
                self.queue(
                    &id,
                    OutboxOp::Create {
                        fields,
                        stamps: server_stamps::<E>(),
                        at: crate::store::server_timestamp(ctx.now),
                    },
                )
                .await;
                entity
            }
        }
    }

    /// Create or replace a record under a caller-chosen id.
    pub async fn put(&self, id: &str, input: E::Input) -> E {
        let ctx = self.context();
        let fields = E::new_fields(input, &ctx);

        let write = stamped::<E>(Write::new(fields.clone()));
        let result = self.store.set(E::COLLECTION, id, write).await;
        let entity = materialize::<E>(id.to_string(), fields.clone(), ctx.now);
        self.mirror_insert(&entity).await;

        if let Err(e) = result {
            tracing::warn!("Error writing {}/{id}, storing locally: {e}", E::COLLECTION);
            if e.is_unavailable() {
                self.queue(
                    id,
                    OutboxOp::Put {
                        fields,
                        stamps: server_stamps::<E>(),
                        at: crate::store::server_timestamp(ctx.now),
                    },
                )
                .await;
            }
        }
        entity
    }

    pub async fn update(&self, id: &str, patch: &E::Patch) {
        let fields = record::fields_of(patch);
        if fields.is_empty() {
            return;
        }

        if self.is_pending_create(id).await {
            self.mirror_patch(id, &fields).await;
            self.queue(id, OutboxOp::Update { fields }).await;
            return;
        }

        let write = Write::new(fields.clone()).stamp("updatedAt");
        let result = self.store.update(E::COLLECTION, id, write).await;
        self.mirror_patch(id, &fields).await;

        if let Err(e) = result {
            tracing::warn!("Error updating {}/{id}, patching local cache: {e}", E::COLLECTION);
            if e.is_unavailable() {
                self.queue(id, OutboxOp::Update { fields }).await;
            }
        }
    }

    pub async fn set_status(&self, id: &str, status: &E::Status) -> Result<(), AppError> {
        E::validate_status(status)?;
        self.write_status(id, status).await;
        Ok(())
    }

    /// Status write without [`Entity::validate_status`]; for flows that own a
    /// reserved status (payments).
    pub(crate) async fn write_status(&self, id: &str, status: &E::Status) {
        let value = serde_json::to_value(status).unwrap_or(Value::Null);
        let mut fields = Fields::new();
        fields.insert(E::STATUS_FIELD.to_string(), value.clone());

        let op = OutboxOp::SetStatus {
            field: E::STATUS_FIELD.to_string(),
            value,
        };

        if self.is_pending_create(id).await {
            self.mirror_patch(id, &fields).await;
            self.queue(id, op).await;
            return;
        }

        let write = Write::new(fields.clone()).stamp("updatedAt");
        let result = self.store.update(E::COLLECTION, id, write).await;
        self.mirror_patch(id, &fields).await;

        if let Err(e) = result {
            tracing::warn!(
                "Error updating {} status for {id}, patching local cache: {e}",
                E::COLLECTION
            );
            if e.is_unavailable() {
                self.queue(id, op).await;
            }
        }
    }

    /// Delete a record. Deleting an unknown id is a no-op.
    pub async fn delete(&self, id: &str) {
        if self.is_pending_create(id).await {
            self.mirror_remove(id).await;
            self.outbox.discard(E::COLLECTION, id).await;
            return;
        }

        let result = self.store.delete(E::COLLECTION, id).await;
        self.mirror_remove(id).await;

        if let Err(e) = result {
            tracing::warn!("Error deleting {}/{id}, removing from local cache: {e}", E::COLLECTION);
            if e.is_unavailable() {
                self.queue(id, OutboxOp::Delete).await;
            }
        }
    }

    fn context(&self) -> CreateContext {
        CreateContext {
            now: Utc::now(),
            portal_base_url: self.portal_base_url.to_string(),
        }
    }

    /// Whether `id` was minted offline and its create has not reached the store.
    async fn is_pending_create(&self, id: &str) -> bool {
        is_local_id(id) && self.outbox.pending_creates(E::COLLECTION).await.contains(id)
    }

    async fn queue(&self, id: &str, op: OutboxOp) {
        self.outbox
            .push(OutboxEntry::new(E::COLLECTION, E::CACHE_KEY, id, op))
            .await;
    }

    /// Replace the scope's remote-origin records in the cache with a fresh
    /// snapshot. Returns the local-origin records of the scope still waiting
    /// for reconciliation.
    async fn refresh_mirror(&self, scope: &Scope, remote: &[E]) -> Vec<E> {
        let snapshot: Vec<Value> = remote.iter().map(record::to_record).collect();
        let queued = self.outbox.pending_creates(E::COLLECTION).await;
        let is_pending = |r: &Value| record::record_id(r).is_some_and(|id| queued.contains(id));
        self.cache
            .modify(E::CACHE_KEY, |records| {
                let pending: Vec<Value> = records
                    .iter()
                    .filter(|r| scope.matches(r) && is_pending(r))
                    .cloned()
                    .collect();

                let remote_ids: Vec<&str> = remote.iter().map(|e| e.id()).collect();
                records.retain(|r| {
                    let id = record::record_id(r);
                    let in_scope_remote = scope.matches(r) && !is_pending(r);
                    !in_scope_remote && !id.is_some_and(|id| remote_ids.contains(&id))
                });

                let at = records
                    .iter()
                    .position(|r| !is_pending(r))
                    .unwrap_or(records.len());
                records.splice(at..at, snapshot);

                pending.iter().filter_map(record::from_record).collect()
            })
            .await
    }

    /// Mirror a remotely read record into the cache, replacing it in place.
    pub async fn remember(&self, entity: &E) {
        let record = record::to_record(entity);
        let id = entity.id().to_string();
        self.cache
            .modify(E::CACHE_KEY, |records| {
                match records
                    .iter_mut()
                    .find(|r| record::record_id(r) == Some(id.as_str()))
                {
                    Some(existing) => *existing = record,
                    None => records.insert(0, record),
                }
            })
            .await;
    }

    async fn mirror_insert(&self, entity: &E) {
        let record = record::to_record(entity);
        let id = entity.id().to_string();
        self.cache
            .modify(E::CACHE_KEY, |records| {
                records.retain(|r| record::record_id(r) != Some(id.as_str()));
                records.insert(0, record);
            })
            .await;
    }

    async fn mirror_patch(&self, id: &str, fields: &Fields) {
        let today = record::today();
        self.cache
            .modify(E::CACHE_KEY, |records| {
                let Some(Value::Object(existing)) = records
                    .iter_mut()
                    .find(|r| record::record_id(r) == Some(id))
                else {
                    return;
                };
                for (key, value) in fields {
                    existing.insert(key.clone(), value.clone());
                }
                if E::OPTIONAL_DATE_FIELDS.contains(&"updatedAt") {
                    existing.insert("updatedAt".to_string(), Value::String(today));
                }
            })
            .await;
    }

    async fn mirror_remove(&self, id: &str) {
        self.cache
            .modify(E::CACHE_KEY, |records| {
                records.retain(|r| record::record_id(r) != Some(id))
            })
            .await;
    }
}

fn stamped<E: Entity>(write: Write) -> Write {
    E::SERVER_TIMESTAMPS
        .iter()
        .fold(write, |write, field| write.stamp(*field))
}

fn server_stamps<E: Entity>() -> Vec<String> {
    E::SERVER_TIMESTAMPS.iter().map(|s| s.to_string()).collect()
}

/// The entity a caller gets back from a write: the written fields plus
/// client-side values for every server timestamp, so both paths return the
/// same shape.
fn materialize<E: Entity>(id: String, mut fields: Fields, now: DateTime<Utc>) -> E {
    let stamp = Value::String(crate::store::server_timestamp(now));
    for field in E::SERVER_TIMESTAMPS {
        fields.insert(field.to_string(), stamp.clone());
    }
    E::from_document(&Document { id, fields })
}

fn sort_newest_first<E: Entity>(items: &mut [E]) {
    items.sort_by(|a, b| b.created_at().cmp(a.created_at()));
}
