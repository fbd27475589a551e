//! Identity snapshots from the host platform.
//!
//! The host platform owns identities; this module only reads them. Every
//! permission computation works on a fresh snapshot so there is nothing to
//! invalidate between synchronization passes.

mod allowlist;
pub mod provider;
mod resolver;

pub use allowlist::AdminAllowlist;
pub use provider::{IdentityProvider, LinkedIdentity, PgIdentityProvider};
pub use resolver::{resolve, Resolution};

/// Main-character affiliation for an identity.
///
/// `corporation_ceo_id` is pre-fetched by the provider so the resolver can
/// stay a pure function; a failed CEO lookup simply leaves it `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affiliation {
    pub character_id: i64,
    pub character_name: String,
    pub corporation_id: i64,
    pub corporation_name: Option<String>,
    pub corporation_ticker: Option<String>,
    pub corporation_ceo_id: Option<i64>,
    pub alliance_id: Option<i64>,
    pub titles: Vec<String>,
}

/// One managed person, as seen by the host platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable numeric id owned by the host platform.
    pub id: i64,
    /// Account display name.
    pub name: String,
    /// Operator-assigned nickname, if any.
    pub nickname: Option<String>,
    /// Host platform superuser flag.
    pub superuser: bool,
    /// Named role assignments on the host platform.
    pub roles: Vec<String>,
    /// Primary affiliation; `None` when the account has no main character.
    pub main_character: Option<Affiliation>,
}

impl Identity {
    /// The name this identity should carry on the voice server: nickname
    /// first, then main-character name, then account name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if let Some(nick) = self.nickname.as_deref() {
            return nick;
        }
        if let Some(main) = &self.main_character {
            return &main.character_name;
        }
        &self.name
    }
}
