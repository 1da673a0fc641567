pub mod analytics;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod live;
pub mod models;
pub mod notifications;
pub mod outbox;
pub mod payments;
pub mod repo;
pub mod routes;
pub mod state;
pub mod storage;
pub mod store;
pub mod sync;
pub mod users;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::cache::{ListCache, LocalCache};
use crate::config::Config;
use crate::notifications::NotificationCenter;
use crate::payments::{HttpPaymentProcessor, PaymentProcessor, Settlements};
use crate::state::{AppState, SharedState};
use crate::storage::LocalObjectStorage;
use crate::store::DocumentStore;

/// Wire the shared state around an already-connected document store.
pub fn build_state(
    config: Config,
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn LocalCache>,
) -> SharedState {
    let payments: Option<Arc<dyn PaymentProcessor>> =
        config
            .payment_url
            .as_ref()
            .and_then(|url| match HttpPaymentProcessor::new(url) {
                Ok(processor) => {
                    tracing::info!("Payment processor configured at {url}");
                    Some(Arc::new(processor) as Arc<dyn PaymentProcessor>)
                }
                Err(e) => {
                    tracing::warn!("Payment processor not available: {e}");
                    None
                }
            });

    let storage = LocalObjectStorage::new(&config.storage_dir, &config.storage_base_url);

    Arc::new(AppState {
        store,
        cache: ListCache::new(cache),
        storage: Arc::new(storage),
        payments,
        settlements: Settlements::new(),
        notifications: NotificationCenter::new(),
        sync_lock: Mutex::new(()),
        config,
    })
}

pub fn build_app(state: SharedState) -> Router {
    let storage_dir = state.config.storage_dir.clone();
    let max_upload_size = state.config.max_upload_size;

    Router::new()
        .merge(routes::api_routes())
        .nest_service("/storage", ServeDir::new(storage_dir))
        .route("/health", axum::routing::get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_upload_size)),
        )
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
