//! Plain-text rendering of sweep reports and delegation listings

use std::fmt::Write;

use action_log::delegation::{DelegationRecord, SweepReport};
use chrono::{DateTime, Utc};

fn expiry(record: &DelegationRecord) -> String {
    record
        .delegation
        .expires_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "never".to_string())
}

fn overdue(record: &DelegationRecord, now: DateTime<Utc>) -> String {
    match record.delegation.expires_at {
        Some(at) => {
            let secs = (now - at).num_seconds().max(0);
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        }
        None => "-".to_string(),
    }
}

pub fn render_sweep(report: &SweepReport, now: DateTime<Utc>, verbose: bool) -> String {
    let mut out = String::new();

    if report.expired.is_empty() {
        let _ = writeln!(out, "No expired delegations found.");
        return out;
    }

    let _ = writeln!(
        out,
        "Found {} expired delegation(s) still marked active.",
        report.found()
    );

    for record in &report.expired {
        let d = &record.delegation;
        let _ = writeln!(
            out,
            "  - {} -> {} ({}, expired {})",
            record.delegator_name,
            record.delegate_name,
            d.reason.as_str(),
            expiry(record)
        );
        if verbose {
            let _ = writeln!(out, "      id:       {}", d.id);
            let _ = writeln!(out, "      created:  {}", d.created_at.to_rfc3339());
            let _ = writeln!(out, "      overdue:  {}", overdue(record, now));
            let _ = writeln!(
                out,
                "      returns:  approval authority back to {}",
                record.delegator_name
            );
        }
    }

    if report.dry_run {
        let _ = writeln!(out, "[DRY RUN] No changes were made.");
    } else {
        let _ = writeln!(
            out,
            "Deactivated {} delegation(s) ({} leave, {} other).",
            report.deactivated,
            report.deactivated_leave,
            report.deactivated - report.deactivated_leave
        );
    }

    out
}

pub fn render_list(records: &[DelegationRecord], now: DateTime<Utc>) -> String {
    let mut out = String::new();

    if records.is_empty() {
        let _ = writeln!(out, "No delegations.");
        return out;
    }

    for record in records {
        let d = &record.delegation;
        let state = if d.is_valid(now) {
            "valid"
        } else if d.is_active {
            "expired"
        } else {
            "revoked"
        };
        let _ = writeln!(
            out,
            "{}  {:<7}  {:<5}  {} -> {}  expires {}",
            d.id,
            state,
            d.reason.as_str(),
            record.delegator_name,
            record.delegate_name,
            expiry(record)
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_log::delegation::{Delegation, DelegationReason};
    use chrono::Duration;
    use uuid::Uuid;

    fn record(reason: DelegationReason, expires_at: Option<DateTime<Utc>>, is_active: bool) -> DelegationRecord {
        DelegationRecord {
            delegation: Delegation {
                id: Uuid::new_v4(),
                delegator_id: Uuid::new_v4(),
                delegate_id: Uuid::new_v4(),
                reason,
                expires_at,
                is_active,
                created_at: Utc::now() - Duration::days(3),
                revoked_at: None,
                revoked_by: None,
            },
            delegator_name: "Grace Achieng".to_string(),
            delegate_name: "Tom Mugisha".to_string(),
        }
    }

    #[test]
    fn test_empty_sweep() {
        let out = render_sweep(&SweepReport::default(), Utc::now(), false);
        assert_eq!(out, "No expired delegations found.\n");
    }

    #[test]
    fn test_dry_run_sweep_says_so() {
        let now = Utc::now();
        let report = SweepReport {
            dry_run: true,
            expired: vec![record(DelegationReason::Leave, Some(now - Duration::hours(2)), true)],
            deactivated: 0,
            deactivated_leave: 0,
        };
        let out = render_sweep(&report, now, true);
        assert!(out.contains("Found 1 expired"));
        assert!(out.contains("Grace Achieng -> Tom Mugisha"));
        assert!(out.contains("overdue:  2h 0m"));
        assert!(out.contains("[DRY RUN]"));
    }

    #[test]
    fn test_sweep_summary_counts_reasons() {
        let now = Utc::now();
        let past = Some(now - Duration::minutes(1));
        let report = SweepReport {
            dry_run: false,
            expired: vec![
                record(DelegationReason::Leave, past, true),
                record(DelegationReason::Other, past, true),
            ],
            deactivated: 2,
            deactivated_leave: 1,
        };
        let out = render_sweep(&report, now, false);
        assert!(out.contains("Deactivated 2 delegation(s) (1 leave, 1 other)."));
    }

    #[test]
    fn test_sweep_summary_counts_only_rows_flipped_here() {
        let now = Utc::now();
        let past = Some(now - Duration::minutes(1));
        // A concurrent sweep already flipped the leave row
        let report = SweepReport {
            dry_run: false,
            expired: vec![
                record(DelegationReason::Leave, past, true),
                record(DelegationReason::Other, past, true),
            ],
            deactivated: 1,
            deactivated_leave: 0,
        };
        let out = render_sweep(&report, now, false);
        assert!(out.contains("Found 2 expired"));
        assert!(out.contains("Deactivated 1 delegation(s) (0 leave, 1 other)."));
    }

    #[test]
    fn test_list_states() {
        let now = Utc::now();
        let out = render_list(
            &[
                record(DelegationReason::Other, None, true),
                record(DelegationReason::Leave, Some(now - Duration::hours(1)), true),
                record(DelegationReason::Other, None, false),
            ],
            now,
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("valid"));
        assert!(lines[0].contains("expires never"));
        assert!(lines[1].contains("expired"));
        assert!(lines[2].contains("revoked"));
    }
}
