//! Delegation records and their validity rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why approval authority was handed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationReason {
    /// Delegator is on leave; an expiry is mandatory
    Leave,
    Other,
}

impl DelegationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelegationReason::Leave => "leave",
            DelegationReason::Other => "other",
        }
    }

    pub fn requires_expiry(&self) -> bool {
        matches!(self, DelegationReason::Leave)
    }
}

impl std::str::FromStr for DelegationReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leave" => Ok(DelegationReason::Leave),
            "other" => Ok(DelegationReason::Other),
            _ => Err(format!("Invalid delegation reason: {}", s)),
        }
    }
}

/// A time-bounded grant of approval authority from one user to another.
///
/// `is_active` flips from `true` to `false` at most once, either by manual
/// revocation or by the expiration sweep. Records are never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    pub id: Uuid,
    pub delegator_id: Uuid,
    pub delegate_id: Uuid,
    pub reason: DelegationReason,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    /// Set for manual revocations only
    pub revoked_by: Option<Uuid>,
}

impl Delegation {
    /// `expires_at` is set and has been reached
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }

    /// Active and not expired
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }

    pub fn is_leave(&self) -> bool {
        self.reason == DelegationReason::Leave
    }

    /// Still flagged active although its expiry has passed; the sweep's target set
    pub fn needs_sweep(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.is_expired(now)
    }
}

/// A delegation together with the display names of both parties
#[derive(Debug, Clone)]
pub struct DelegationRecord {
    pub delegation: Delegation,
    pub delegator_name: String,
    pub delegate_name: String,
}
