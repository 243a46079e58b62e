//! Who may hand approval authority to whom
//!
//! Checked once, when a delegation is created.

use chrono::{DateTime, Utc};

use super::record::DelegationReason;
use crate::error::{AppError, Result};
use crate::models::{Role, User};

/// Role pairs allowed to delegate, as (delegator, delegate)
const ELIGIBLE_PAIRS: &[(Role, Role)] = &[
    (Role::Commissioner, Role::AssistantCommissioner),
    (Role::AssistantCommissioner, Role::PrincipalEconomist),
    (Role::PrincipalEconomist, Role::SeniorEconomist),
];

/// Whether `delegate` may receive approval authority from `delegator`
pub fn is_eligible_pair(delegator: Role, delegate: Role) -> bool {
    if delegator == Role::SuperAdmin {
        return delegate.can_approve() && delegate != Role::SuperAdmin;
    }
    ELIGIBLE_PAIRS
        .iter()
        .any(|&(from, to)| from == delegator && to == delegate)
}

/// Roles that may receive a delegation from `delegator`
pub fn eligible_delegate_roles(delegator: Role) -> Vec<Role> {
    [
        Role::Economist,
        Role::SeniorEconomist,
        Role::PrincipalEconomist,
        Role::AssistantCommissioner,
        Role::Commissioner,
        Role::SuperAdmin,
    ]
    .into_iter()
    .filter(|&role| is_eligible_pair(delegator, role))
    .collect()
}

/// Validate a delegation request before anything is written
pub fn validate_new_delegation(
    delegator: &User,
    delegate: &User,
    reason: DelegationReason,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<()> {
    match expires_at {
        None if reason.requires_expiry() => {
            return Err(AppError::Validation(
                "expiresAt is required for leave delegations".to_string(),
            ));
        }
        Some(at) if at <= now => {
            return Err(AppError::Validation(
                "expiresAt must be in the future".to_string(),
            ));
        }
        _ => {}
    }

    if delegator.id == delegate.id {
        return Err(AppError::Validation(
            "Cannot delegate to yourself".to_string(),
        ));
    }

    if !delegate.is_active {
        return Err(AppError::Validation(format!(
            "User {} is not active",
            delegate.username
        )));
    }

    if !delegator.role.can_approve() {
        return Err(AppError::Validation(format!(
            "Role {} has no approval authority to delegate",
            delegator.role.label()
        )));
    }

    if !is_eligible_pair(delegator.role, delegate.role) {
        let allowed: Vec<&str> = eligible_delegate_roles(delegator.role)
            .iter()
            .map(|role| role.label())
            .collect();
        return Err(AppError::Validation(format!(
            "{} cannot delegate to {} (eligible: {})",
            delegator.role.label(),
            delegate.role.label(),
            allowed.join(", ")
        )));
    }

    Ok(())
}
