//! Effective-approver resolution
//!
//! Pure functions over a set of delegation records and the current time.
//! Callers load the relevant records (see `Store::active_delegations_involving`)
//! and ask who must act.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::record::Delegation;
use crate::models::User;

/// Outcome of resolving a nominal approver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// The nominal approver
    pub base_id: Uuid,
    /// Who must act now
    pub effective_id: Uuid,
    /// The delegation that moved authority, if any
    pub via_delegation: Option<Uuid>,
}

impl Resolution {
    pub fn is_delegated(&self) -> bool {
        self.via_delegation.is_some()
    }
}

/// The base user's valid outstanding delegation.
///
/// At most one should exist. If several do, the most recently created one
/// wins, ties broken by the larger id.
pub fn outstanding_delegation<'a>(
    base_id: Uuid,
    delegations: &'a [Delegation],
    now: DateTime<Utc>,
) -> Option<&'a Delegation> {
    delegations
        .iter()
        .filter(|d| d.delegator_id == base_id && d.is_valid(now))
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        })
}

/// Who must approve an item whose nominal approver is `base_id`
pub fn resolve_effective_approver(
    base_id: Uuid,
    delegations: &[Delegation],
    now: DateTime<Utc>,
) -> Resolution {
    match outstanding_delegation(base_id, delegations, now) {
        Some(d) => Resolution {
            base_id,
            effective_id: d.delegate_id,
            via_delegation: Some(d.id),
        },
        None => Resolution {
            base_id,
            effective_id: base_id,
            via_delegation: None,
        },
    }
}

/// Whether some delegator has a valid delegation naming `user_id`
pub fn has_taken_over(user_id: Uuid, delegations: &[Delegation], now: DateTime<Utc>) -> bool {
    delegations
        .iter()
        .any(|d| d.delegate_id == user_id && d.is_valid(now))
}

/// Like [`has_taken_over`], restricted to leave delegations
pub fn has_leave_responsibilities(
    user_id: Uuid,
    delegations: &[Delegation],
    now: DateTime<Utc>,
) -> bool {
    delegations
        .iter()
        .any(|d| d.delegate_id == user_id && d.is_leave() && d.is_valid(now))
}

/// Whether the user's own approval authority is handed to someone else
pub fn is_suspended(user_id: Uuid, delegations: &[Delegation], now: DateTime<Utc>) -> bool {
    outstanding_delegation(user_id, delegations, now).is_some()
}

/// Role authority unless suspended, or authority taken over from a delegator
pub fn can_approve(user: &User, delegations: &[Delegation], now: DateTime<Utc>) -> bool {
    (user.role.can_approve() && !is_suspended(user.id, delegations, now))
        || has_taken_over(user.id, delegations, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegation::DelegationReason;
    use crate::models::Role;
    use chrono::Duration;

    fn delegation(
        delegator_id: Uuid,
        delegate_id: Uuid,
        reason: DelegationReason,
        expires_at: Option<DateTime<Utc>>,
    ) -> Delegation {
        Delegation {
            id: Uuid::new_v4(),
            delegator_id,
            delegate_id,
            reason,
            expires_at,
            is_active: true,
            created_at: Utc::now() - Duration::hours(1),
            revoked_at: None,
            revoked_by: None,
        }
    }

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: role.as_str().to_string(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            designation: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_delegation_resolves_to_base() {
        let d = Uuid::new_v4();
        let r = resolve_effective_approver(d, &[], Utc::now());
        assert_eq!(r.effective_id, d);
        assert!(!r.is_delegated());
    }

    #[test]
    fn test_valid_delegation_resolves_to_delegate() {
        let now = Utc::now();
        let (d, a) = (Uuid::new_v4(), Uuid::new_v4());
        let grant = delegation(d, a, DelegationReason::Leave, Some(now + Duration::days(2)));
        let records = vec![grant.clone()];

        let r = resolve_effective_approver(d, &records, now);
        assert_eq!(r.effective_id, a);
        assert_eq!(r.via_delegation, Some(grant.id));
        assert!(has_taken_over(a, &records, now));
        assert!(has_leave_responsibilities(a, &records, now));
        assert!(is_suspended(d, &records, now));
    }

    #[test]
    fn test_expired_delegation_resolves_to_base_even_before_sweep() {
        let now = Utc::now();
        let (d, a) = (Uuid::new_v4(), Uuid::new_v4());
        let records = vec![delegation(
            d,
            a,
            DelegationReason::Leave,
            Some(now - Duration::seconds(1)),
        )];

        assert_eq!(resolve_effective_approver(d, &records, now).effective_id, d);
        assert!(!has_taken_over(a, &records, now));
    }

    #[test]
    fn test_revoked_delegation_resolves_to_base() {
        let now = Utc::now();
        let (d, a) = (Uuid::new_v4(), Uuid::new_v4());
        let mut grant = delegation(d, a, DelegationReason::Other, None);
        grant.is_active = false;
        let records = vec![grant];

        assert_eq!(resolve_effective_approver(d, &records, now).effective_id, d);
        assert!(!is_suspended(d, &records, now));
    }

    #[test]
    fn test_other_reason_is_takeover_but_not_leave_responsibility() {
        let now = Utc::now();
        let (d, a) = (Uuid::new_v4(), Uuid::new_v4());
        let records = vec![delegation(d, a, DelegationReason::Other, None)];

        assert!(has_taken_over(a, &records, now));
        assert!(!has_leave_responsibilities(a, &records, now));
    }

    #[test]
    fn test_delegation_to_someone_else_is_ignored() {
        let now = Utc::now();
        let (d, a, b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let records = vec![delegation(d, a, DelegationReason::Other, None)];

        assert_eq!(resolve_effective_approver(b, &records, now).effective_id, b);
        assert!(!has_taken_over(b, &records, now));
    }

    #[test]
    fn test_most_recent_outstanding_wins() {
        let now = Utc::now();
        let (d, a, b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let older = delegation(d, a, DelegationReason::Other, None);
        let mut newer = delegation(d, b, DelegationReason::Other, None);
        newer.created_at = older.created_at + Duration::minutes(1);
        let records = vec![newer.clone(), older];

        assert_eq!(resolve_effective_approver(d, &records, now).effective_id, b);
    }

    #[test]
    fn test_can_approve_combines_role_and_delegation() {
        let now = Utc::now();
        let commissioner = user(Role::Commissioner);
        let assistant = user(Role::AssistantCommissioner);
        let economist = user(Role::Economist);
        let principal = user(Role::PrincipalEconomist);

        assert!(can_approve(&commissioner, &[], now));
        assert!(!can_approve(&economist, &[], now));

        let records = vec![delegation(
            commissioner.id,
            assistant.id,
            DelegationReason::Leave,
            Some(now + Duration::days(1)),
        )];
        assert!(!can_approve(&commissioner, &records, now));
        assert!(can_approve(&assistant, &records, now));

        let records = vec![delegation(
            principal.id,
            economist.id,
            DelegationReason::Other,
            None,
        )];
        assert!(can_approve(&economist, &records, now));
        assert!(!can_approve(&principal, &records, now));
    }
}
