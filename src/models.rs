//! Data models for users, action logs and the API payloads built from them
//!
//! Response types are explicit projections of primitive fields (ids, names,
//! RFC 3339 timestamps). Internal records never cross the serialization
//! boundary directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delegation::{DelegationReason, DelegationRecord};

/// Name used when a referenced user can no longer be looked up
pub const UNKNOWN_USER_NAME: &str = "Unknown User";

/// Organisational role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Economist,
    SeniorEconomist,
    PrincipalEconomist,
    AssistantCommissioner,
    Commissioner,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Economist => "economist",
            Role::SeniorEconomist => "senior_economist",
            Role::PrincipalEconomist => "principal_economist",
            Role::AssistantCommissioner => "assistant_commissioner",
            Role::Commissioner => "commissioner",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Role::Economist => "Economist",
            Role::SeniorEconomist => "Senior Economist",
            Role::PrincipalEconomist => "Principal Economist",
            Role::AssistantCommissioner => "Assistant Commissioner",
            Role::Commissioner => "Commissioner",
            Role::SuperAdmin => "Super Admin",
        }
    }

    /// Whether the role approves action logs on its own authority
    pub fn can_approve(&self) -> bool {
        matches!(
            self,
            Role::PrincipalEconomist
                | Role::AssistantCommissioner
                | Role::Commissioner
                | Role::SuperAdmin
        )
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "economist" => Ok(Role::Economist),
            "senior_economist" => Ok(Role::SeniorEconomist),
            "principal_economist" => Ok(Role::PrincipalEconomist),
            "assistant_commissioner" => Ok(Role::AssistantCommissioner),
            "commissioner" => Ok(Role::Commissioner),
            "super_admin" => Ok(Role::SuperAdmin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// A user of the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub designation: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        display_name(
            Some(&self.first_name),
            Some(&self.last_name),
            Some(&self.username),
        )
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

/// Join first and last name, falling back to the username and then to
/// [`UNKNOWN_USER_NAME`].
pub fn display_name(first: Option<&str>, last: Option<&str>, username: Option<&str>) -> String {
    let full = format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default());
    let full = full.trim();
    if !full.is_empty() {
        return full.to_string();
    }
    match username {
        Some(u) if !u.trim().is_empty() => u.to_string(),
        _ => UNKNOWN_USER_NAME.to_string(),
    }
}

/// Status of an action log awaiting a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionLogStatus {
    PendingApproval,
    Approved,
    Rejected,
}

impl ActionLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionLogStatus::PendingApproval => "pending_approval",
            ActionLogStatus::Approved => "approved",
            ActionLogStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for ActionLogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_approval" => Ok(ActionLogStatus::PendingApproval),
            "approved" => Ok(ActionLogStatus::Approved),
            "rejected" => Ok(ActionLogStatus::Rejected),
            _ => Err(format!("Invalid action log status: {}", s)),
        }
    }
}

/// An action log routed to a nominal approver
#[derive(Debug, Clone)]
pub struct ActionLog {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
    pub approver_id: Uuid,
    pub status: ActionLogStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Requests

/// Request to create a delegation; the caller is the delegator
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDelegationRequest {
    pub delegated_to_id: Uuid,
    pub reason: DelegationReason,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Query string for delegation listings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationListQuery {
    pub reason: Option<DelegationReason>,
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionLogRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub approver_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

// Responses

/// Plain id/name pair used wherever another user is referenced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.full_name(),
        }
    }
}

/// Flattened delegation as returned by the API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationView {
    pub id: Uuid,
    pub delegated_by_id: Uuid,
    pub delegated_by_name: String,
    pub delegated_to_id: Uuid,
    pub delegated_to_name: String,
    pub reason: DelegationReason,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_expired: bool,
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by_id: Option<Uuid>,
}

impl DelegationView {
    pub fn project(record: &DelegationRecord, now: DateTime<Utc>) -> Self {
        let d = &record.delegation;
        Self {
            id: d.id,
            delegated_by_id: d.delegator_id,
            delegated_by_name: record.delegator_name.clone(),
            delegated_to_id: d.delegate_id,
            delegated_to_name: record.delegate_name.clone(),
            reason: d.reason,
            expires_at: d.expires_at,
            is_active: d.is_active,
            is_expired: d.is_expired(now),
            is_valid: d.is_valid(now),
            created_at: d.created_at,
            revoked_at: d.revoked_at,
            revoked_by_id: d.revoked_by,
        }
    }
}

/// One page of a delegation listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationPage {
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<DelegationView>,
}

/// The caller's own delegations
#[derive(Debug, Serialize)]
pub struct MyDelegations {
    pub given: Vec<DelegationView>,
    pub received: Vec<DelegationView>,
}

/// Profile payload of `GET /users/me/`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub designation: String,
    pub is_active: bool,
    pub has_leave_delegation_responsibilities: bool,
    pub can_approve_action_logs: bool,
    pub effective_approver: UserRef,
    pub active_delegation: Option<DelegationView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_by_id: Uuid,
    pub approver: UserRef,
    pub effective_approver: UserRef,
    pub status: ActionLogStatus,
    pub approved_by_id: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub can_approve: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
