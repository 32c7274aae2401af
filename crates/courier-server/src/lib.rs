//! Courier server library logic.
//!
//! Exposes the management surface over HTTP: subscription CRUD, ledger
//! queries, and an event intake endpoint that hands events to the
//! dispatcher in the background.

pub mod api;
pub mod api_deliveries;
pub mod api_events;
pub mod api_subscriptions;
pub mod config;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use courier_db::DbPool;
use courier_delivery::{DeliveryExecutor, Dispatcher};
use courier_ledger::SqliteLedger;
use courier_registry::SqliteRegistry;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

/// Dispatcher over the SQLite-backed registry and ledger.
pub type CourierDispatcher = Dispatcher<SqliteRegistry, SqliteLedger>;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Subscription storage.
    pub registry: Arc<SqliteRegistry>,
    /// Delivery history.
    pub ledger: Arc<SqliteLedger>,
    /// Event fan-out, sharing the registry and ledger above.
    pub dispatcher: CourierDispatcher,
}

impl AppState {
    /// Wires registry, ledger and dispatcher onto one migrated pool.
    pub fn new(pool: DbPool, executor: DeliveryExecutor, max_concurrency: usize) -> Self {
        let registry = Arc::new(SqliteRegistry::new(pool.clone()));
        let ledger = Arc::new(SqliteLedger::new(pool));
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
            executor,
            max_concurrency,
        );
        Self {
            registry,
            ledger,
            dispatcher,
        }
    }
}

/// Maximum request body size (2 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/subscriptions",
            post(api_subscriptions::create_subscription_handler)
                .get(api_subscriptions::list_subscriptions_handler),
        )
        .route(
            "/api/subscriptions/{id}",
            get(api_subscriptions::get_subscription_handler)
                .delete(api_subscriptions::delete_subscription_handler),
        )
        .route(
            "/api/subscriptions/{id}/deliveries/summary",
            get(api_deliveries::subscription_summary_handler),
        )
        .route("/api/deliveries", get(api_deliveries::list_deliveries_handler))
        .route(
            "/api/deliveries/{id}",
            get(api_deliveries::get_delivery_handler),
        )
        .route("/api/events", post(api_events::publish_event_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
