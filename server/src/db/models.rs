//! Database Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Link between a host platform account and its voice server registration.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MurmurAccount {
    /// Host platform account id.
    pub user_id: i64,
    /// Registration name on the voice server.
    pub murmur_username: String,
    /// Remote registration id; `None` until the first successful sync.
    pub murmur_user_id: Option<i32>,
    /// Operator-assigned nickname overriding the display name.
    pub nickname: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
