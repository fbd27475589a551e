//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! All query functions include error context logging to aid debugging.

use sqlx::PgPool;
use tracing::error;

use super::models::MurmurAccount;

/// Log and return a database error with context.
///
/// This helper ensures all database errors are logged with relevant context
/// before being propagated, making production debugging easier.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

// ============================================================================
// Murmur Account Queries
// ============================================================================

/// Find the voice account link for a host platform account.
pub async fn find_account_by_user_id(
    pool: &PgPool,
    user_id: i64,
) -> sqlx::Result<Option<MurmurAccount>> {
    sqlx::query_as::<_, MurmurAccount>("SELECT * FROM murmur_accounts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_account_by_user_id", user_id = %user_id))
}

/// All linked accounts, for operator listing.
pub async fn list_accounts(pool: &PgPool) -> sqlx::Result<Vec<MurmurAccount>> {
    sqlx::query_as::<_, MurmurAccount>("SELECT * FROM murmur_accounts ORDER BY user_id")
        .fetch_all(pool)
        .await
        .map_err(db_error!("list_accounts", table = "murmur_accounts"))
}

/// Create or refresh the account link for a host platform account.
pub async fn upsert_account(
    pool: &PgPool,
    user_id: i64,
    murmur_username: &str,
) -> sqlx::Result<MurmurAccount> {
    sqlx::query_as::<_, MurmurAccount>(
        r"
        INSERT INTO murmur_accounts (user_id, murmur_username)
        VALUES ($1, $2)
        ON CONFLICT (user_id)
        DO UPDATE SET murmur_username = EXCLUDED.murmur_username, updated_at = NOW()
        RETURNING *
        ",
    )
    .bind(user_id)
    .bind(murmur_username)
    .fetch_one(pool)
    .await
    .map_err(db_error!("upsert_account", user_id = %user_id))
}

/// Record the remote registration id learned during a sync pass.
pub async fn set_remote_id(
    pool: &PgPool,
    user_id: i64,
    murmur_user_id: i32,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE murmur_accounts SET murmur_user_id = $2, updated_at = NOW() WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(murmur_user_id)
    .execute(pool)
    .await
    .map_err(db_error!("set_remote_id", user_id = %user_id))?;
    Ok(())
}

/// Set or clear the nickname override for an account.
pub async fn set_nickname(
    pool: &PgPool,
    user_id: i64,
    nickname: Option<&str>,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE murmur_accounts SET nickname = $2, updated_at = NOW() WHERE user_id = $1")
        .bind(user_id)
        .bind(nickname)
        .execute(pool)
        .await
        .map_err(db_error!("set_nickname", user_id = %user_id))?;
    Ok(())
}

/// Remove the account link.
pub async fn delete_account(pool: &PgPool, user_id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM murmur_accounts WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(db_error!("delete_account", user_id = %user_id))?;
    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Settings Queries
// ============================================================================

/// Read a service setting; `None` when unset.
pub async fn get_setting(pool: &PgPool, key: &str) -> sqlx::Result<Option<String>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT value FROM bridge_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
            .map_err(db_error!("get_setting", key = %key))?;
    Ok(row.map(|(value,)| value))
}

/// Write a service setting.
pub async fn set_setting(pool: &PgPool, key: &str, value: &str) -> sqlx::Result<()> {
    sqlx::query(
        r"
        INSERT INTO bridge_settings (key, value)
        VALUES ($1, $2)
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
        ",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .map_err(db_error!("set_setting", key = %key))?;
    Ok(())
}
