//! Delegation lifecycle integration tests
//!
//! Exercises the store, resolver and sweep together against an in-memory
//! database, following a delegation from creation through expiry or revocation.

use action_log::db;
use action_log::delegation::resolver::{
    can_approve, has_leave_responsibilities, has_taken_over, resolve_effective_approver,
};
use action_log::delegation::{sweep_expired, DelegationReason};
use action_log::models::{Role, User};
use action_log::store::{DelegationFilter, NewUser, Store};
use chrono::{DateTime, Duration, Utc};

async fn setup_store() -> Store {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    Store::new(pool)
}

async fn user(store: &Store, username: &str, role: Role) -> User {
    store
        .create_user(NewUser {
            username: username.to_string(),
            first_name: username.to_uppercase(),
            last_name: "Tester".to_string(),
            role,
            designation: Some(role.label().to_string()),
        })
        .await
        .unwrap()
}

async fn resolve(store: &Store, base: &User, now: DateTime<Utc>) -> uuid::Uuid {
    let delegations = store.active_delegations_involving(base.id).await.unwrap();
    resolve_effective_approver(base.id, &delegations, now).effective_id
}

#[tokio::test]
async fn test_expired_leave_returns_authority_after_sweep() {
    let store = setup_store().await;
    let d = user(&store, "delegator", Role::Commissioner).await;
    let a = user(&store, "delegate", Role::AssistantCommissioner).await;
    let now = Utc::now();

    store
        .create_delegation(
            d.id,
            a.id,
            DelegationReason::Leave,
            Some(now - Duration::seconds(1)),
            now - Duration::days(5),
        )
        .await
        .unwrap();

    // Already invalid before the sweep flips the flag
    assert_eq!(resolve(&store, &d, now).await, d.id);

    let report = sweep_expired(&store, now, false).await.unwrap();
    assert_eq!(report.deactivated, 1);
    assert_eq!(resolve(&store, &d, now).await, d.id);

    let delegations = store.active_delegations_involving(a.id).await.unwrap();
    assert!(delegations.is_empty());
    assert!(!has_leave_responsibilities(a.id, &delegations, now));
}

#[tokio::test]
async fn test_valid_delegation_moves_authority() {
    let store = setup_store().await;
    let d = user(&store, "delegator", Role::Commissioner).await;
    let a = user(&store, "delegate", Role::AssistantCommissioner).await;
    let now = Utc::now();

    store
        .create_delegation(
            d.id,
            a.id,
            DelegationReason::Leave,
            Some(now + Duration::days(3)),
            now,
        )
        .await
        .unwrap();

    assert_eq!(resolve(&store, &d, now).await, a.id);

    let for_a = store.active_delegations_involving(a.id).await.unwrap();
    assert!(has_taken_over(a.id, &for_a, now));
    assert!(has_leave_responsibilities(a.id, &for_a, now));
    assert!(can_approve(&a, &for_a, now));

    let for_d = store.active_delegations_involving(d.id).await.unwrap();
    assert!(!can_approve(&d, &for_d, now));

    // Same rows, later clock: the delegation has lapsed
    let later = now + Duration::days(3);
    assert_eq!(resolve(&store, &d, later).await, d.id);
    assert!(can_approve(&d, &for_d, later));
}

#[tokio::test]
async fn test_manual_revoke_reverts_immediately() {
    let store = setup_store().await;
    let d = user(&store, "delegator", Role::AssistantCommissioner).await;
    let a = user(&store, "delegate", Role::PrincipalEconomist).await;
    let now = Utc::now();

    let grant = store
        .create_delegation(d.id, a.id, DelegationReason::Other, None, now)
        .await
        .unwrap();
    assert_eq!(resolve(&store, &d, now).await, a.id);

    assert!(store
        .deactivate_delegation(grant.id, Some(d.id), now)
        .await
        .unwrap());
    assert_eq!(resolve(&store, &d, now).await, d.id);

    let record = store.get_delegation(grant.id).await.unwrap();
    assert!(!record.delegation.is_active);
    assert_eq!(record.delegation.revoked_by, Some(d.id));
    assert!(record.delegation.revoked_at.is_some());

    // The delegator may hand off again once the slot is free
    store
        .create_delegation(d.id, a.id, DelegationReason::Other, None, now)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sweep_twice_counts_zero_second_time() {
    let store = setup_store().await;
    let c = user(&store, "comm", Role::Commissioner).await;
    let ac = user(&store, "asst", Role::AssistantCommissioner).await;
    let pe = user(&store, "princ", Role::PrincipalEconomist).await;
    let se = user(&store, "senior", Role::SeniorEconomist).await;
    let now = Utc::now();
    let past = Some(now - Duration::minutes(10));

    store
        .create_delegation(c.id, ac.id, DelegationReason::Leave, past, now - Duration::days(1))
        .await
        .unwrap();
    store
        .create_delegation(ac.id, pe.id, DelegationReason::Other, past, now - Duration::days(1))
        .await
        .unwrap();
    store
        .create_delegation(pe.id, se.id, DelegationReason::Other, None, now)
        .await
        .unwrap();

    let dry = sweep_expired(&store, now, true).await.unwrap();
    assert_eq!(dry.found(), 2);
    assert_eq!(dry.deactivated, 0);

    let first = sweep_expired(&store, now, false).await.unwrap();
    assert_eq!(first.deactivated, 2);

    let second = sweep_expired(&store, now, false).await.unwrap();
    assert_eq!(second.found(), 0);
    assert_eq!(second.deactivated, 0);

    let active = DelegationFilter {
        reason: None,
        active: Some(true),
    };
    assert_eq!(store.count_delegations(active).await.unwrap(), 1);
}

#[tokio::test]
async fn test_one_active_delegation_per_delegator() {
    let store = setup_store().await;
    let d = user(&store, "delegator", Role::Commissioner).await;
    let a = user(&store, "first", Role::AssistantCommissioner).await;
    let b = user(&store, "second", Role::AssistantCommissioner).await;
    let now = Utc::now();

    store
        .create_delegation(d.id, a.id, DelegationReason::Other, None, now)
        .await
        .unwrap();

    let err = store
        .create_delegation(d.id, b.id, DelegationReason::Other, None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, action_log::error::AppError::Conflict(_)));

    // A different delegator may still hand off to the same delegate
    let other = user(&store, "other", Role::Commissioner).await;
    store
        .create_delegation(other.id, a.id, DelegationReason::Other, None, now)
        .await
        .unwrap();
    assert_eq!(store.delegations_received(a.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_expiry_at_exact_instant_counts_as_expired() {
    let store = setup_store().await;
    let d = user(&store, "delegator", Role::Commissioner).await;
    let a = user(&store, "delegate", Role::AssistantCommissioner).await;
    let now = Utc::now();

    store
        .create_delegation(d.id, a.id, DelegationReason::Leave, Some(now), now - Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(resolve(&store, &d, now).await, d.id);
    let report = sweep_expired(&store, now, false).await.unwrap();
    assert_eq!(report.deactivated, 1);
}
