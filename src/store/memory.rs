//! In-process document store.
//!
//! Used for local development (`SHIFTER_STORE=memory`) and as the test double
//! for the remote store. [`MemoryDocumentStore::set_online`] simulates losing
//! and regaining connectivity.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{Document, DocumentStore, Query, SnapshotStream, StoreError, Write};

const CHANGE_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<Inner>,
}

struct Inner {
    collections: DashMap<String, Vec<Document>>,
    online: AtomicBool,
    /// Name of the collection that changed; an empty name is a connectivity poke.
    changes: broadcast::Sender<String>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                collections: DashMap::new(),
                online: AtomicBool::new(true),
                changes,
            }),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
        let _ = self.inner.changes.send(String::new());
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.receiver_count()
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        }
    }

    fn snapshot(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.ensure_online()?;
        let mut documents: Vec<Document> = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| query.matches(&doc.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        query.sort(&mut documents);
        Ok(documents)
    }

    fn notify(&self, collection: &str) {
        // No receivers is not an error.
        let _ = self.changes.send(collection.to_string());
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.snapshot(collection, query)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.ensure_online()?;
        Ok(self
            .inner
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id).cloned()))
    }

    async fn insert(&self, collection: &str, write: Write) -> Result<String, StoreError> {
        self.inner.ensure_online()?;
        let id = Uuid::now_v7().simple().to_string();
        self.inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields: write.resolve(),
            });
        self.inner.notify(collection);
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, write: Write) -> Result<(), StoreError> {
        self.inner.ensure_online()?;
        let fields = write.resolve();
        {
            let mut docs = self
                .inner
                .collections
                .entry(collection.to_string())
                .or_default();
            match docs.iter_mut().find(|doc| doc.id == id) {
                Some(existing) => existing.fields = fields,
                None => docs.push(Document {
                    id: id.to_string(),
                    fields,
                }),
            }
        }
        self.inner.notify(collection);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, write: Write) -> Result<(), StoreError> {
        self.inner.ensure_online()?;
        let fields = write.resolve();
        {
            let mut docs = self
                .inner
                .collections
                .get_mut(collection)
                .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
            let existing = docs
                .iter_mut()
                .find(|doc| doc.id == id)
                .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
            existing.fields.extend(fields);
        }
        self.inner.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.ensure_online()?;
        if let Some(mut docs) = self.inner.collections.get_mut(collection) {
            docs.retain(|doc| doc.id != id);
        }
        self.inner.notify(collection);
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        self.inner.ensure_online()?;
        Ok(self
            .inner
            .collections
            .get(collection)
            .map(|docs| docs.len() as u64)
            .unwrap_or(0))
    }

    async fn subscribe(&self, collection: &str, query: Query) -> Result<SnapshotStream, StoreError> {
        self.inner.ensure_online()?;

        let state = Subscription {
            inner: self.inner.clone(),
            receiver: self.inner.changes.subscribe(),
            collection: collection.to_string(),
            query,
            primed: false,
            done: false,
        };

        Ok(stream::unfold(state, next_snapshot).boxed())
    }
}

struct Subscription {
    inner: Arc<Inner>,
    receiver: broadcast::Receiver<String>,
    collection: String,
    query: Query,
    primed: bool,
    done: bool,
}

async fn next_snapshot(
    mut sub: Subscription,
) -> Option<(Result<Vec<Document>, StoreError>, Subscription)> {
    if sub.done {
        return None;
    }

    if !sub.primed {
        sub.primed = true;
    } else {
        loop {
            match sub.receiver.recv().await {
                Ok(changed) if changed.is_empty() || changed == sub.collection => break,
                Ok(_) => continue,
                // Missed some changes; a fresh snapshot covers them.
                Err(broadcast::error::RecvError::Lagged(_)) => break,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    let result = sub.inner.snapshot(&sub.collection, &sub.query);
    if result.is_err() {
        sub.done = true;
    }
    Some((result, sub))
}
