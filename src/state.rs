use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cache::ListCache;
use crate::config::Config;
use crate::notifications::NotificationCenter;
use crate::payments::{PaymentProcessor, Settlements};
use crate::repo::{Entity, Repository};
use crate::storage::ObjectStorage;
use crate::store::DocumentStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub cache: ListCache,
    pub storage: Arc<dyn ObjectStorage>,
    pub payments: Option<Arc<dyn PaymentProcessor>>,
    /// Serializes payment outcomes per invoice.
    pub settlements: Settlements,
    pub notifications: NotificationCenter,
    /// Held for the duration of an outbox sync pass.
    pub sync_lock: Mutex<()>,
}

impl AppState {
    pub fn repo<E: Entity>(&self) -> Repository<E> {
        Repository::new(self.store.clone(), self.cache.clone())
            .with_portal_base_url(&self.config.portal_base_url)
    }
}
