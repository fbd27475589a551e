//! Derived permission roles.
//!
//! A role is computed fresh from the identity snapshot on every pass and is
//! never persisted, so it cannot go stale against the identity platform.

use serde::{Deserialize, Serialize};

use super::bundle::{ChannelPermissions, PermissionBundle, PermissionScope};

/// Permission classification for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform superuser or allow-listed operator.
    Admin,
    /// Admin granted through a named platform role.
    SeatAdmin,
    /// CEO of the main character's corporation.
    CorpCeo,
    /// Holds a leadership title in the main character's corporation.
    CorpDirector,
    /// Moderator granted through a named platform role.
    SeatModerator,
    /// Fleet commander, moderates the fleet channel only.
    FleetCommander,
    /// Everyone else with a registered voice account.
    Member,
    /// Unregistered visitor; never produced by the resolver.
    Guest,
}

/// Coarse tier of a role; determines how the sync engine applies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleClass {
    Admin,
    Moderator,
    Member,
}

impl Role {
    #[must_use]
    pub const fn class(self) -> RoleClass {
        match self {
            Self::Admin | Self::SeatAdmin => RoleClass::Admin,
            Self::CorpCeo | Self::CorpDirector | Self::SeatModerator | Self::FleetCommander => {
                RoleClass::Moderator
            }
            Self::Member | Self::Guest => RoleClass::Member,
        }
    }

    /// The bundle this role grants.
    ///
    /// `CorpDirector` is the moderator tier with the kick bit withheld.
    #[must_use]
    pub const fn bundle(self) -> PermissionBundle {
        match self {
            Self::Admin | Self::SeatAdmin => {
                PermissionBundle::grant(ChannelPermissions::ROLE_ADMIN)
            }
            Self::CorpCeo | Self::SeatModerator | Self::FleetCommander => {
                PermissionBundle::grant(ChannelPermissions::ROLE_MODERATOR)
            }
            Self::CorpDirector => PermissionBundle::grant(
                ChannelPermissions::ROLE_MODERATOR.difference(ChannelPermissions::KICK),
            ),
            Self::Member => PermissionBundle::grant(ChannelPermissions::ROLE_USER),
            Self::Guest => PermissionBundle::grant(ChannelPermissions::ROLE_GUEST),
        }
    }

    /// Where the bundle applies.
    #[must_use]
    pub const fn scope(self) -> PermissionScope {
        match self {
            Self::CorpCeo | Self::CorpDirector => PermissionScope::Corporation,
            Self::FleetCommander => PermissionScope::Fleet,
            _ => PermissionScope::Global,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::SeatAdmin => "seat_admin",
            Self::CorpCeo => "corp_ceo",
            Self::CorpDirector => "corp_director",
            Self::SeatModerator => "seat_moderator",
            Self::FleetCommander => "fleet_commander",
            Self::Member => "member",
            Self::Guest => "guest",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
