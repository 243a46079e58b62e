//! Caller identity and the login hook
//!
//! Credentials are verified upstream; requests carry the caller's user id
//! in the `X-User-Id` header.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use super::extract::ApiJson;
use super::users::build_me;
use crate::delegation::sweep::sweep_quietly;
use crate::error::{AppError, Result};
use crate::models::{LoginRequest, MeResponse, User};
use crate::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated, active caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing X-User-Id header".to_string()))?;

        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| AppError::Unauthorized("Malformed X-User-Id header".to_string()))?;

        let user = state
            .store
            .find_user(id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::Unauthorized("Unknown or inactive user".to_string()))?;

        Ok(CurrentUser(user))
    }
}

/// `POST /auth/login/`: sweeps expired delegations, then returns the profile
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<MeResponse>> {
    let user = state
        .store
        .find_user_by_username(req.username.trim())
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Unknown or inactive user".to_string()))?;

    let now = Utc::now();
    let revoked = sweep_quietly(&state.store, now).await;
    if revoked > 0 {
        tracing::info!(
            username = %user.username,
            revoked,
            "revoked expired delegations on login"
        );
    }

    Ok(Json(build_me(&state.store, &user, now).await?))
}
