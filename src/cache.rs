//! Local persisted fallback cache.
//!
//! A key-value mirror holding one serialized record list per entity type. It is
//! best effort: read and write failures are logged at debug level and otherwise
//! ignored, so the cache can never fail a request.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;

#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn read(&self, key: &str) -> Option<String>;
    async fn write(&self, key: &str, value: String);
}

/// One JSON file per key inside a directory.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn read(&self, key: &str) -> Option<String> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::debug!("Cache read for {key} failed: {e}");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: String) {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        let result = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&tmp, value).await?;
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = result {
            tracing::debug!("Cache write for {key} failed: {e}");
        }
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    async fn write(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

/// Record-list view over a [`LocalCache`].
///
/// Read-modify-write cycles on the same key are serialized within the process.
/// Other processes sharing the backing store are not coordinated.
#[derive(Clone)]
pub struct ListCache {
    backend: Arc<dyn LocalCache>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ListCache {
    pub fn new(backend: Arc<dyn LocalCache>) -> Self {
        Self {
            backend,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// The stored records, or an empty list when missing or unreadable.
    pub async fn load(&self, key: &str) -> Vec<Value> {
        let Some(raw) = self.backend.read(key).await else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::debug!("Cache entry {key} is not a record list: {e}");
                Vec::new()
            }
        }
    }

    async fn save(&self, key: &str, records: &[Value]) {
        match serde_json::to_string(records) {
            Ok(raw) => self.backend.write(key, raw).await,
            Err(e) => tracing::debug!("Cache entry {key} could not be serialized: {e}"),
        }
    }

    /// Load, mutate and persist the list under `key` while holding its lock.
    pub async fn modify<F, R>(&self, key: &str, f: F) -> R
    where
        F: FnOnce(&mut Vec<Value>) -> R + Send,
        R: Send,
    {
        let lock = self.locks.entry(key.to_string()).or_default().clone();
        let _guard = lock.lock().await;

        let mut records = self.load(key).await;
        let result = f(&mut records);
        self.save(key, &records).await;
        result
    }
}
