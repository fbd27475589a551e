//! Personal password records.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::error;

/// Lifecycle of a personal password record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "auth_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    /// Created, never used.
    Pending,
    /// Last attempt succeeded.
    Authenticated,
    /// Last attempt failed.
    Failed,
    /// Record kept but excluded from authentication.
    Disabled,
}

/// One personal password record, keyed by voice registration name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuthRecord {
    pub murmur_username: String,
    /// Host platform account the record belongs to.
    pub user_id: i64,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: AuthStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence for personal password records.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// The record for a username, unless disabled or absent.
    async fn find_enabled(&self, murmur_username: &str) -> Result<Option<AuthRecord>>;

    /// Create or replace the record for a username. A replaced record
    /// drops back to pending. Fails when the username has no account link;
    /// records always reference a host account.
    async fn upsert(&self, murmur_username: &str, password_hash: &str) -> Result<()>;

    /// The record for a host account, regardless of status.
    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<AuthRecord>>;

    /// Delete the record; false when none existed.
    async fn delete(&self, murmur_username: &str) -> Result<bool>;

    /// All records, including disabled ones.
    async fn list(&self) -> Result<Vec<AuthRecord>>;

    async fn mark_status(&self, murmur_username: &str, status: AuthStatus) -> Result<()>;

    /// Record a successful login time.
    async fn touch_login(&self, murmur_username: &str) -> Result<()>;
}

/// [`AuthStore`] backed by the `murmur_user_auth` table.
#[derive(Clone)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

macro_rules! auth_db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Auth store query failed");
            e
        }
    };
}

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn find_enabled(&self, murmur_username: &str) -> Result<Option<AuthRecord>> {
        let record = sqlx::query_as::<_, AuthRecord>(
            "SELECT * FROM murmur_user_auth WHERE murmur_username = $1 AND status <> 'disabled'",
        )
        .bind(murmur_username)
        .fetch_optional(&self.pool)
        .await
        .map_err(auth_db_error!("find_enabled", username = %murmur_username))?;
        Ok(record)
    }

    async fn upsert(&self, murmur_username: &str, password_hash: &str) -> Result<()> {
        // The host account id comes from the account link; a name without
        // one inserts zero rows.
        let result = sqlx::query(
            r"
            INSERT INTO murmur_user_auth (murmur_username, user_id, password_hash, status)
            SELECT a.murmur_username, a.user_id, $2, 'pending'
            FROM murmur_accounts a
            WHERE a.murmur_username = $1
            ON CONFLICT (murmur_username)
            DO UPDATE SET password_hash = EXCLUDED.password_hash,
                          status = 'pending',
                          updated_at = NOW()
            ",
        )
        .bind(murmur_username)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(auth_db_error!("upsert", username = %murmur_username))?;

        if result.rows_affected() == 0 {
            anyhow::bail!("'{murmur_username}' has no linked voice account");
        }
        Ok(())
    }

    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<AuthRecord>> {
        let record =
            sqlx::query_as::<_, AuthRecord>("SELECT * FROM murmur_user_auth WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(auth_db_error!("find_by_user_id", user_id = %user_id))?;
        Ok(record)
    }

    async fn delete(&self, murmur_username: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM murmur_user_auth WHERE murmur_username = $1")
            .bind(murmur_username)
            .execute(&self.pool)
            .await
            .map_err(auth_db_error!("delete", username = %murmur_username))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<AuthRecord>> {
        let records = sqlx::query_as::<_, AuthRecord>(
            "SELECT * FROM murmur_user_auth ORDER BY murmur_username",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(auth_db_error!("list", table = "murmur_user_auth"))?;
        Ok(records)
    }

    async fn mark_status(&self, murmur_username: &str, status: AuthStatus) -> Result<()> {
        sqlx::query(
            "UPDATE murmur_user_auth SET status = $2, updated_at = NOW() WHERE murmur_username = $1",
        )
        .bind(murmur_username)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(auth_db_error!("mark_status", username = %murmur_username))?;
        Ok(())
    }

    async fn touch_login(&self, murmur_username: &str) -> Result<()> {
        sqlx::query(
            r"
            UPDATE murmur_user_auth
            SET last_login_at = NOW(), updated_at = NOW()
            WHERE murmur_username = $1
            ",
        )
        .bind(murmur_username)
        .execute(&self.pool)
        .await
        .map_err(auth_db_error!("touch_login", username = %murmur_username))?;
        Ok(())
    }
}
