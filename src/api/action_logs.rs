//! Action log endpoints
//!
//! A log is routed to a nominal approver; whoever currently holds that
//! approver's authority (see the resolver) decides it.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::auth::CurrentUser;
use super::extract::{ApiJson, ApiPath};
use super::users::user_ref;
use crate::delegation::{resolve_effective_approver, Resolution};
use crate::error::{AppError, Result};
use crate::models::{
    ActionLog, ActionLogStatus, ActionLogView, CreateActionLogRequest, DecisionRequest, User,
};
use crate::store::Store;
use crate::AppState;

/// `POST /action-logs/`
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(author): CurrentUser,
    ApiJson(req): ApiJson<CreateActionLogRequest>,
) -> Result<(StatusCode, Json<ActionLogView>)> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }

    let approver = state
        .store
        .find_user(req.approver_id)
        .await?
        .ok_or_else(|| AppError::Validation(format!("User {} does not exist", req.approver_id)))?;
    if !approver.role.can_approve() {
        return Err(AppError::Validation(format!(
            "{} cannot approve action logs",
            approver.full_name()
        )));
    }

    let log = state
        .store
        .create_action_log(author.id, title, req.description.trim(), approver.id)
        .await?;
    tracing::info!(action_log_id = %log.id, approver = %approver.username, "action log created");

    let view = project(&state.store, &log, &author, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /action-logs/{id}/`
pub async fn get(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ActionLogView>> {
    let log = state.store.get_action_log(id).await?;
    Ok(Json(project(&state.store, &log, &caller, Utc::now()).await?))
}

/// `POST /action-logs/{id}/approve/`
pub async fn approve(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ActionLogView>> {
    decide(&state.store, &caller, id, ActionLogStatus::Approved, None).await
}

/// `POST /action-logs/{id}/reject/`
pub async fn reject(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<DecisionRequest>,
) -> Result<Json<ActionLogView>> {
    let reason = req
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::Validation("A rejection reason is required".to_string()))?;

    decide(&state.store, &caller, id, ActionLogStatus::Rejected, Some(reason)).await
}

async fn decide(
    store: &Store,
    caller: &User,
    id: Uuid,
    status: ActionLogStatus,
    reason: Option<&str>,
) -> Result<Json<ActionLogView>> {
    let log = store.get_action_log(id).await?;
    if log.status != ActionLogStatus::PendingApproval {
        return Err(AppError::Conflict(format!(
            "Action log {} is already {}",
            id,
            log.status.as_str()
        )));
    }

    let now = Utc::now();
    let resolution = resolve(store, log.approver_id, now).await?;
    if !may_decide(caller, &resolution) {
        tracing::warn!(
            action_log_id = %id,
            caller = %caller.username,
            effective_approver = %resolution.effective_id,
            "decision refused"
        );
        return Err(AppError::Forbidden(
            "You are not the current approver of this action log".to_string(),
        ));
    }

    if !store
        .decide_action_log(id, status, caller.id, reason, now)
        .await?
    {
        return Err(AppError::Conflict(format!(
            "Action log {} was decided concurrently",
            id
        )));
    }
    tracing::info!(
        action_log_id = %id,
        decided_by = %caller.username,
        status = status.as_str(),
        delegated = resolution.is_delegated(),
        "action log decided"
    );

    let log = store.get_action_log(id).await?;
    Ok(Json(project(store, &log, caller, now).await?))
}

async fn resolve(store: &Store, approver_id: Uuid, now: DateTime<Utc>) -> Result<Resolution> {
    let delegations = store.active_delegations_involving(approver_id).await?;
    Ok(resolve_effective_approver(approver_id, &delegations, now))
}

fn may_decide(caller: &User, resolution: &Resolution) -> bool {
    caller.is_super_admin() || caller.id == resolution.effective_id
}

async fn project(
    store: &Store,
    log: &ActionLog,
    caller: &User,
    now: DateTime<Utc>,
) -> Result<ActionLogView> {
    let resolution = resolve(store, log.approver_id, now).await?;

    Ok(ActionLogView {
        id: log.id,
        title: log.title.clone(),
        description: log.description.clone(),
        created_by_id: log.created_by,
        approver: user_ref(store, log.approver_id).await?,
        effective_approver: user_ref(store, resolution.effective_id).await?,
        status: log.status,
        approved_by_id: log.approved_by,
        approved_at: log.approved_at,
        rejection_reason: log.rejection_reason.clone(),
        can_approve: log.status == ActionLogStatus::PendingApproval
            && may_decide(caller, &resolution),
        created_at: log.created_at,
        updated_at: log.updated_at,
    })
}
