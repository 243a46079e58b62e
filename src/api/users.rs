//! User profile endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::auth::CurrentUser;
use crate::delegation::resolver;
use crate::error::Result;
use crate::models::{DelegationView, MeResponse, User, UserRef, UNKNOWN_USER_NAME};
use crate::store::Store;
use crate::AppState;

/// `GET /users/me/`
pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MeResponse>> {
    Ok(Json(build_me(&state.store, &user, Utc::now()).await?))
}

/// Id/name pair for a user id, tolerating users that no longer exist
pub(crate) async fn user_ref(store: &Store, id: Uuid) -> Result<UserRef> {
    Ok(match store.find_user(id).await? {
        Some(user) => UserRef::from(&user),
        None => UserRef {
            id,
            name: UNKNOWN_USER_NAME.to_string(),
        },
    })
}

pub(crate) async fn build_me(store: &Store, user: &User, now: DateTime<Utc>) -> Result<MeResponse> {
    let delegations = store.active_delegations_involving(user.id).await?;
    let resolution = resolver::resolve_effective_approver(user.id, &delegations, now);

    let effective_approver = if resolution.effective_id == user.id {
        UserRef::from(user)
    } else {
        user_ref(store, resolution.effective_id).await?
    };

    let active_delegation = match resolution.via_delegation {
        Some(id) => Some(DelegationView::project(&store.get_delegation(id).await?, now)),
        None => None,
    };

    Ok(MeResponse {
        id: user.id,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        role: user.role,
        designation: user.designation.clone().unwrap_or_default(),
        is_active: user.is_active,
        has_leave_delegation_responsibilities: resolver::has_leave_responsibilities(
            user.id,
            &delegations,
            now,
        ),
        can_approve_action_logs: resolver::can_approve(user, &delegations, now),
        effective_approver,
        active_delegation,
    })
}
