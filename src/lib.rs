//! Action Log server - approval workflows with time-bounded delegation

pub mod api;
pub mod config;
pub mod db;
pub mod delegation;
pub mod error;
pub mod models;
pub mod store;

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
pub struct AppState {
    pub store: store::Store,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Arc::new(Self {
            store: store::Store::new(pool),
        })
    }
}

/// The full application router with tracing and CORS layers
pub fn app(state: Arc<AppState>) -> Router {
    api::routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
