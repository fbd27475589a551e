//! Identity snapshots read from the host platform database.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use super::{Affiliation, Identity};
use crate::db::MurmurAccount;

/// An identity together with its voice account link. Only linked accounts
/// take part in synchronization.
#[derive(Debug, Clone)]
pub struct LinkedIdentity {
    pub identity: Identity,
    pub account: MurmurAccount,
}

/// Read access to host platform identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Every identity with a voice account link.
    async fn list_registered(&self) -> Result<Vec<LinkedIdentity>>;

    /// One identity by host account id.
    async fn find_by_id(&self, user_id: i64) -> Result<Option<LinkedIdentity>>;
}

#[derive(Debug, FromRow)]
struct IdentityRow {
    user_id: i64,
    name: String,
    superuser: bool,
    main_character_id: Option<i64>,
    murmur_username: String,
    murmur_user_id: Option<i32>,
    nickname: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, FromRow)]
struct AffiliationRow {
    character_id: i64,
    character_name: String,
    corporation_id: i64,
    corporation_name: Option<String>,
    corporation_ticker: Option<String>,
    corporation_ceo_id: Option<i64>,
    alliance_id: Option<i64>,
}

const IDENTITY_SELECT: &str = r"
    SELECT u.id AS user_id, u.name, u.superuser, u.main_character_id,
           a.murmur_username, a.murmur_user_id, a.nickname,
           a.created_at, a.updated_at
    FROM murmur_accounts a
    JOIN host_users u ON u.id = a.user_id
";

/// The CEO id travels on the affiliation row so role resolution never
/// needs to reach back into the database. The corporation join is LEFT so
/// a character whose corporation record is missing still resolves, just
/// without a corporation role.
const AFFILIATION_SELECT: &str = r"
    SELECT c.id AS character_id, c.name AS character_name,
           c.corporation_id,
           corp.name AS corporation_name, corp.ticker AS corporation_ticker,
           corp.ceo_id AS corporation_ceo_id, corp.alliance_id
    FROM characters c
    LEFT JOIN corporations corp ON corp.id = c.corporation_id
    WHERE c.id = ANY($1)
";

/// [`IdentityProvider`] backed by the host platform schema.
#[derive(Clone)]
pub struct PgIdentityProvider {
    pool: PgPool,
}

impl PgIdentityProvider {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Assemble full identities from the base rows in three bulk queries,
    /// avoiding a per-identity round trip on large passes.
    async fn assemble(&self, rows: Vec<IdentityRow>) -> Result<Vec<LinkedIdentity>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
        let character_ids: Vec<i64> = rows.iter().filter_map(|r| r.main_character_id).collect();

        let mut roles_by_user: HashMap<i64, Vec<String>> = HashMap::new();
        let role_rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT user_id, role_name FROM host_user_roles WHERE user_id = ANY($1)")
                .bind(&user_ids)
                .fetch_all(&self.pool)
                .await?;
        for (user_id, role_name) in role_rows {
            roles_by_user.entry(user_id).or_default().push(role_name);
        }

        let mut affiliations: HashMap<i64, Affiliation> = HashMap::new();
        let mut titles_by_character: HashMap<i64, Vec<String>> = HashMap::new();
        if !character_ids.is_empty() {
            let affiliation_rows: Vec<AffiliationRow> = sqlx::query_as(AFFILIATION_SELECT)
                .bind(&character_ids)
                .fetch_all(&self.pool)
                .await?;

            let title_rows: Vec<(i64, String)> = sqlx::query_as(
                "SELECT character_id, title FROM character_titles WHERE character_id = ANY($1)",
            )
            .bind(&character_ids)
            .fetch_all(&self.pool)
            .await?;
            for (character_id, title) in title_rows {
                titles_by_character
                    .entry(character_id)
                    .or_default()
                    .push(title);
            }

            for row in affiliation_rows {
                let titles = titles_by_character
                    .remove(&row.character_id)
                    .unwrap_or_default();
                affiliations.insert(
                    row.character_id,
                    Affiliation {
                        character_id: row.character_id,
                        character_name: row.character_name,
                        corporation_id: row.corporation_id,
                        corporation_name: row.corporation_name,
                        corporation_ticker: row.corporation_ticker,
                        corporation_ceo_id: row.corporation_ceo_id,
                        alliance_id: row.alliance_id,
                        titles,
                    },
                );
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let main_character = row
                    .main_character_id
                    .and_then(|id| affiliations.get(&id).cloned());
                LinkedIdentity {
                    identity: Identity {
                        id: row.user_id,
                        name: row.name,
                        nickname: row.nickname.clone(),
                        superuser: row.superuser,
                        roles: roles_by_user.remove(&row.user_id).unwrap_or_default(),
                        main_character,
                    },
                    account: MurmurAccount {
                        user_id: row.user_id,
                        murmur_username: row.murmur_username,
                        murmur_user_id: row.murmur_user_id,
                        nickname: row.nickname,
                        created_at: row.created_at,
                        updated_at: row.updated_at,
                    },
                }
            })
            .collect())
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn list_registered(&self) -> Result<Vec<LinkedIdentity>> {
        let rows: Vec<IdentityRow> =
            sqlx::query_as(&format!("{IDENTITY_SELECT} ORDER BY u.id"))
                .fetch_all(&self.pool)
                .await?;
        self.assemble(rows).await
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<LinkedIdentity>> {
        let rows: Vec<IdentityRow> =
            sqlx::query_as(&format!("{IDENTITY_SELECT} WHERE u.id = $1"))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(self.assemble(rows).await?.into_iter().next())
    }
}
