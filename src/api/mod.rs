//! HTTP API

pub mod action_logs;
pub mod auth;
pub mod delegations;
pub mod extract;
pub mod users;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

/// All routes, without middleware layers
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login/", post(auth::login))
        .route("/users/me/", get(users::me))
        .route(
            "/delegations/",
            get(delegations::list).post(delegations::create),
        )
        .route("/delegations/mine/", get(delegations::mine))
        .route("/delegations/:id/revoke/", post(delegations::revoke))
        .route("/action-logs/", post(action_logs::create))
        .route("/action-logs/:id/", get(action_logs::get))
        .route("/action-logs/:id/approve/", post(action_logs::approve))
        .route("/action-logs/:id/reject/", post(action_logs::reject))
}

async fn health() -> &'static str {
    "ok"
}
