//! Delegation endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use super::auth::CurrentUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::delegation::eligibility::validate_new_delegation;
use crate::delegation::sweep::sweep_quietly;
use crate::error::{AppError, Result};
use crate::models::{
    CreateDelegationRequest, DelegationListQuery, DelegationPage, DelegationView, MyDelegations,
};
use crate::store::DelegationFilter;
use crate::AppState;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// `POST /delegations/`
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(delegator): CurrentUser,
    ApiJson(req): ApiJson<CreateDelegationRequest>,
) -> Result<(StatusCode, Json<DelegationView>)> {
    let now = Utc::now();

    let delegate = state
        .store
        .find_user(req.delegated_to_id)
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!("User {} does not exist", req.delegated_to_id))
        })?;

    validate_new_delegation(&delegator, &delegate, req.reason, req.expires_at, now)?;

    // An expired but unswept delegation would still hold the one-active slot
    sweep_quietly(&state.store, now).await;

    let delegation = state
        .store
        .create_delegation(delegator.id, delegate.id, req.reason, req.expires_at, now)
        .await?;

    tracing::info!(
        delegation_id = %delegation.id,
        delegator = %delegator.username,
        delegate = %delegate.username,
        reason = delegation.reason.as_str(),
        "delegation created"
    );

    let record = state.store.get_delegation(delegation.id).await?;
    Ok((StatusCode::CREATED, Json(DelegationView::project(&record, now))))
}

/// `GET /delegations/`
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(_caller): CurrentUser,
    ApiQuery(query): ApiQuery<DelegationListQuery>,
) -> Result<Json<DelegationPage>> {
    let page = query.page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::Validation("page starts at 1".to_string()));
    }
    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let now = Utc::now();
    sweep_quietly(&state.store, now).await;

    let filter = DelegationFilter {
        reason: query.reason,
        active: query.active,
    };
    let count = state.store.count_delegations(filter).await?;
    let offset = i64::from(page - 1) * i64::from(page_size);
    let records = state
        .store
        .list_delegations(filter, i64::from(page_size), offset)
        .await?;

    Ok(Json(DelegationPage {
        count,
        page,
        page_size,
        results: records
            .iter()
            .map(|r| DelegationView::project(r, now))
            .collect(),
    }))
}

/// `GET /delegations/mine/`
pub async fn mine(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MyDelegations>> {
    let now = Utc::now();
    sweep_quietly(&state.store, now).await;

    let given = state.store.delegations_given(user.id).await?;
    let received = state.store.delegations_received(user.id).await?;

    Ok(Json(MyDelegations {
        given: given.iter().map(|r| DelegationView::project(r, now)).collect(),
        received: received
            .iter()
            .map(|r| DelegationView::project(r, now))
            .collect(),
    }))
}

/// `POST /delegations/{id}/revoke/`
pub async fn revoke(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DelegationView>> {
    let record = state.store.get_delegation(id).await?;
    if record.delegation.delegator_id != caller.id && !caller.is_super_admin() {
        return Err(AppError::Forbidden(
            "Only the delegator can revoke this delegation".to_string(),
        ));
    }

    let now = Utc::now();
    if !state
        .store
        .deactivate_delegation(id, Some(caller.id), now)
        .await?
    {
        return Err(AppError::Conflict(format!(
            "Delegation {} is already inactive",
            id
        )));
    }

    tracing::info!(
        delegation_id = %id,
        revoked_by = %caller.username,
        "delegation revoked; authority returned to {}",
        record.delegator_name
    );

    let record = state.store.get_delegation(id).await?;
    Ok(Json(DelegationView::project(&record, now)))
}
