//! Database store for users, delegations and action logs

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::delegation::{Delegation, DelegationReason, DelegationRecord};
use crate::error::{AppError, Result};
use crate::models::{display_name, ActionLog, ActionLogStatus, Role, User};

/// Fields for a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub designation: Option<String>,
}

/// Filters accepted by delegation listings
#[derive(Debug, Clone, Copy, Default)]
pub struct DelegationFilter {
    pub reason: Option<DelegationReason>,
    pub active: Option<bool>,
}

/// Delegation columns plus the display-name columns of both parties.
/// Callers append their own WHERE/ORDER BY.
const DELEGATION_SELECT: &str = r#"
    SELECT d.id, d.delegator_id, d.delegate_id, d.reason, d.expires_at, d.is_active,
           d.created_at, d.revoked_at, d.revoked_by,
           dr.first_name AS delegator_first_name, dr.last_name AS delegator_last_name,
           dr.username AS delegator_username,
           de.first_name AS delegate_first_name, de.last_name AS delegate_last_name,
           de.username AS delegate_username
    FROM delegations d
    LEFT JOIN users dr ON dr.id = d.delegator_id
    LEFT JOIN users de ON de.id = d.delegate_id
"#;

/// Total order for listings; stable across pages
const DELEGATION_ORDER: &str = "ORDER BY d.created_at DESC, d.id DESC";

/// Database store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // User operations

    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, first_name, last_name, role, designation, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&new.username)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.role.as_str())
        .bind(&new.designation)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            role: new.role,
            designation: new.designation,
            is_active: true,
            created_at: now,
        })
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        self.find_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, first_name, last_name, role, designation, is_active, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, first_name, last_name, role, designation, is_active, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    pub async fn set_user_active(&self, id: Uuid, is_active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    // Delegation operations

    /// Insert an active delegation. A second active delegation from the same
    /// delegator violates `idx_delegations_one_active` and surfaces as
    /// [`AppError::Conflict`].
    pub async fn create_delegation(
        &self,
        delegator_id: Uuid,
        delegate_id: Uuid,
        reason: DelegationReason,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Delegation> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO delegations (id, delegator_id, delegate_id, reason, expires_at, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(delegator_id.to_string())
        .bind(delegate_id.to_string())
        .bind(reason.as_str())
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(
                "An active delegation already exists for this user".to_string(),
            ),
            other => other,
        })?;

        Ok(Delegation {
            id,
            delegator_id,
            delegate_id,
            reason,
            expires_at,
            is_active: true,
            created_at: now,
            revoked_at: None,
            revoked_by: None,
        })
    }

    pub async fn get_delegation(&self, id: Uuid) -> Result<DelegationRecord> {
        let sql = format!("{} WHERE d.id = ?", DELEGATION_SELECT);
        let row = sqlx::query_as::<_, DelegationRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Delegation {} not found", id)))?;

        row.try_into()
    }

    pub async fn list_delegations(
        &self,
        filter: DelegationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DelegationRecord>> {
        let sql = format!(
            "{} WHERE (? IS NULL OR d.reason = ?) AND (? IS NULL OR d.is_active = ?) {} LIMIT ? OFFSET ?",
            DELEGATION_SELECT, DELEGATION_ORDER
        );
        let reason = filter.reason.map(|r| r.as_str());

        let rows = sqlx::query_as::<_, DelegationRow>(&sql)
            .bind(reason)
            .bind(reason)
            .bind(filter.active)
            .bind(filter.active)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    pub async fn count_delegations(&self, filter: DelegationFilter) -> Result<i64> {
        let reason = filter.reason.map(|r| r.as_str());
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM delegations d
            WHERE (? IS NULL OR d.reason = ?) AND (? IS NULL OR d.is_active = ?)
            "#,
        )
        .bind(reason)
        .bind(reason)
        .bind(filter.active)
        .bind(filter.active)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Delegations the user has granted, newest first
    pub async fn delegations_given(&self, user_id: Uuid) -> Result<Vec<DelegationRecord>> {
        let sql = format!("{} WHERE d.delegator_id = ? {}", DELEGATION_SELECT, DELEGATION_ORDER);
        let rows = sqlx::query_as::<_, DelegationRow>(&sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Delegations naming the user as delegate, newest first
    pub async fn delegations_received(&self, user_id: Uuid) -> Result<Vec<DelegationRecord>> {
        let sql = format!("{} WHERE d.delegate_id = ? {}", DELEGATION_SELECT, DELEGATION_ORDER);
        let rows = sqlx::query_as::<_, DelegationRow>(&sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Active delegations where the user is either party; the input set for
    /// the effective-approver resolver.
    pub async fn active_delegations_involving(&self, user_id: Uuid) -> Result<Vec<Delegation>> {
        let sql = format!(
            "{} WHERE d.is_active = 1 AND (d.delegator_id = ? OR d.delegate_id = ?) {}",
            DELEGATION_SELECT, DELEGATION_ORDER
        );
        let rows = sqlx::query_as::<_, DelegationRow>(&sql)
            .bind(user_id.to_string())
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| DelegationRecord::try_from(r).map(|rec| rec.delegation))
            .collect()
    }

    /// Active delegations whose expiry has been reached.
    ///
    /// Timestamps are stored as UTC RFC 3339 text, so the SQL comparison
    /// narrows the scan; `needs_sweep` stays the authority on the boundary.
    pub async fn expired_active_delegations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DelegationRecord>> {
        let sql = format!(
            "{} WHERE d.is_active = 1 AND d.expires_at IS NOT NULL AND d.expires_at <= ? {}",
            DELEGATION_SELECT, DELEGATION_ORDER
        );
        let rows = sqlx::query_as::<_, DelegationRow>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        let mut expired = Vec::new();
        for row in rows {
            let record = DelegationRecord::try_from(row)?;
            if record.delegation.needs_sweep(now) {
                expired.push(record);
            }
        }
        Ok(expired)
    }

    /// Flip `is_active` to false. Returns whether this call performed the
    /// transition; an already inactive row is left untouched.
    pub async fn deactivate_delegation(
        &self,
        id: Uuid,
        revoked_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE delegations
            SET is_active = 0, revoked_at = ?, revoked_by = ?
            WHERE id = ? AND is_active = 1
            "#,
        )
        .bind(now)
        .bind(revoked_by.map(|u| u.to_string()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // Action log operations

    pub async fn create_action_log(
        &self,
        created_by: Uuid,
        title: &str,
        description: &str,
        approver_id: Uuid,
    ) -> Result<ActionLog> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let status = ActionLogStatus::PendingApproval;

        sqlx::query(
            r#"
            INSERT INTO action_logs (id, title, description, created_by, approver_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(title)
        .bind(description)
        .bind(created_by.to_string())
        .bind(approver_id.to_string())
        .bind(status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ActionLog {
            id,
            title: title.to_string(),
            description: description.to_string(),
            created_by,
            approver_id,
            status,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_action_log(&self, id: Uuid) -> Result<ActionLog> {
        let row = sqlx::query_as::<_, ActionLogRow>(
            r#"
            SELECT id, title, description, created_by, approver_id, status, approved_by,
                   approved_at, rejection_reason, created_at, updated_at
            FROM action_logs
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Action log {} not found", id)))?;

        row.try_into()
    }

    /// Record an approval or rejection on a pending log. Returns whether the
    /// log was still pending.
    pub async fn decide_action_log(
        &self,
        id: Uuid,
        status: ActionLogStatus,
        decided_by: Uuid,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE action_logs
            SET status = ?, approved_by = ?, approved_at = ?, rejection_reason = ?, updated_at = ?
            WHERE id = ? AND status = 'pending_approval'
            "#,
        )
        .bind(status.as_str())
        .bind(decided_by.to_string())
        .bind(now)
        .bind(rejection_reason)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// Internal row types for sqlx

fn parse_uuid(value: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::Internal(format!("Invalid {} UUID: {}", field, e)))
}

fn parse_optional_uuid(value: Option<String>, field: &str) -> Result<Option<Uuid>> {
    value.map(|s| parse_uuid(&s, field)).transpose()
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    first_name: String,
    last_name: String,
    role: String,
    designation: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_uuid(&row.id, "user")?,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row
                .role
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid role: {}", e)))?,
            designation: row.designation,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DelegationRow {
    id: String,
    delegator_id: String,
    delegate_id: String,
    reason: String,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<String>,
    delegator_first_name: Option<String>,
    delegator_last_name: Option<String>,
    delegator_username: Option<String>,
    delegate_first_name: Option<String>,
    delegate_last_name: Option<String>,
    delegate_username: Option<String>,
}

impl TryFrom<DelegationRow> for DelegationRecord {
    type Error = AppError;

    fn try_from(row: DelegationRow) -> Result<Self> {
        let delegation = Delegation {
            id: parse_uuid(&row.id, "delegation")?,
            delegator_id: parse_uuid(&row.delegator_id, "delegator_id")?,
            delegate_id: parse_uuid(&row.delegate_id, "delegate_id")?,
            reason: row
                .reason
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid reason: {}", e)))?,
            expires_at: row.expires_at,
            is_active: row.is_active,
            created_at: row.created_at,
            revoked_at: row.revoked_at,
            revoked_by: parse_optional_uuid(row.revoked_by, "revoked_by")?,
        };

        Ok(DelegationRecord {
            delegation,
            delegator_name: display_name(
                row.delegator_first_name.as_deref(),
                row.delegator_last_name.as_deref(),
                row.delegator_username.as_deref(),
            ),
            delegate_name: display_name(
                row.delegate_first_name.as_deref(),
                row.delegate_last_name.as_deref(),
                row.delegate_username.as_deref(),
            ),
        })
    }
}

#[derive(sqlx::FromRow)]
struct ActionLogRow {
    id: String,
    title: String,
    description: String,
    created_by: String,
    approver_id: String,
    status: String,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ActionLogRow> for ActionLog {
    type Error = AppError;

    fn try_from(row: ActionLogRow) -> Result<Self> {
        Ok(ActionLog {
            id: parse_uuid(&row.id, "action log")?,
            title: row.title,
            description: row.description,
            created_by: parse_uuid(&row.created_by, "created_by")?,
            approver_id: parse_uuid(&row.approver_id, "approver_id")?,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid status: {}", e)))?,
            approved_by: parse_optional_uuid(row.approved_by, "approved_by")?,
            approved_at: row.approved_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
