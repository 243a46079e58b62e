//! Expiration sweep
//!
//! Deactivates delegations whose expiry has passed but which are still
//! flagged active. Every row update is guarded by `is_active = 1`, so runs
//! may overlap: each row flips at most once and later runs count zero.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use super::record::DelegationRecord;
use crate::error::Result;
use crate::store::Store;

/// What a sweep found and did
#[derive(Debug, Default)]
pub struct SweepReport {
    pub dry_run: bool,
    /// Delegations that were due at sweep time
    pub expired: Vec<DelegationRecord>,
    /// Rows this run actually flipped
    pub deactivated: u64,
    /// How many of the flipped rows were leave delegations
    pub deactivated_leave: u64,
}

impl SweepReport {
    pub fn found(&self) -> usize {
        self.expired.len()
    }
}

/// Deactivate every expired delegation, or only report them when `dry_run`
pub async fn sweep_expired(store: &Store, now: DateTime<Utc>, dry_run: bool) -> Result<SweepReport> {
    let expired = store.expired_active_delegations(now).await?;
    let mut deactivated = 0;
    let mut deactivated_leave = 0;

    if !dry_run {
        for record in &expired {
            let d = &record.delegation;
            if store.deactivate_delegation(d.id, None, now).await? {
                deactivated += 1;
                if d.is_leave() {
                    deactivated_leave += 1;
                }
                tracing::info!(
                    delegation_id = %d.id,
                    reason = d.reason.as_str(),
                    expired_at = ?d.expires_at,
                    "delegation expired; authority returned from {} to {}",
                    record.delegate_name,
                    record.delegator_name
                );
            }
        }
    }

    if deactivated > 0 {
        tracing::info!(count = deactivated, "deactivated expired delegations");
    }

    Ok(SweepReport {
        dry_run,
        expired,
        deactivated,
        deactivated_leave,
    })
}

/// Run the sweep, logging instead of failing. Used on read and login paths
/// where a failed sweep must not fail the request.
pub async fn sweep_quietly(store: &Store, now: DateTime<Utc>) -> u64 {
    match sweep_expired(store, now, false).await {
        Ok(report) => report.deactivated,
        Err(e) => {
            tracing::error!("Expired delegation sweep failed: {}", e);
            0
        }
    }
}

/// Spawn a task that sweeps every `interval`
pub fn spawn_periodic(store: Store, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let count = sweep_quietly(&store, Utc::now()).await;
            tracing::debug!(count, "periodic delegation sweep finished");
        }
    })
}
