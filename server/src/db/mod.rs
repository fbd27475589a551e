//! Database Layer
//!
//! `PostgreSQL` connection pool, migrations, and the account link store.

mod models;
mod queries;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
pub use models::*;
pub use queries::*;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::identity::AdminAllowlist;
use crate::sync::AccountStore;

/// Settings key the admin allow-list is stored under.
pub const ADMIN_USERS_KEY: &str = "admin_users";

/// Load the admin allow-list, seeding from configuration when the setting
/// has never been written.
pub async fn load_allowlist(pool: &PgPool, seed: &[String]) -> Result<AdminAllowlist> {
    match get_setting(pool, ADMIN_USERS_KEY).await? {
        Some(stored) => Ok(AdminAllowlist::from_comma_list(&stored)),
        None => Ok(AdminAllowlist::new(seed.to_vec())),
    }
}

/// Persist the admin allow-list.
pub async fn save_allowlist(pool: &PgPool, allowlist: &AdminAllowlist) -> Result<()> {
    set_setting(pool, ADMIN_USERS_KEY, &allowlist.to_comma_list()).await?;
    Ok(())
}

/// Create `PostgreSQL` connection pool with health configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        // Keep minimum connections warm to prevent cold-start latency
        .min_connections(2)
        .max_connections(10)
        // Prevent hanging requests on pool exhaustion
        .acquire_timeout(Duration::from_secs(5))
        // Clean up idle connections to prevent stale connection issues
        .idle_timeout(Duration::from_secs(600))
        // Validate connections before use to catch stale/broken connections
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}

/// [`AccountStore`] backed by the `murmur_accounts` table.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn set_remote_id(&self, user_id: i64, murmur_user_id: i32) -> Result<()> {
        set_remote_id(&self.pool, user_id, murmur_user_id).await?;
        Ok(())
    }
}
