//! Channel permissions using bitflags.
//!
//! Bit values match the Murmur ACL wire encoding, so a mask computed here can
//! be written to a channel ACL entry unchanged. Presets build the four
//! permission tiers used by the resolver and the sync engine.

use bitflags::bitflags;

bitflags! {
    /// Per-channel capabilities as understood by the Murmur ACL model.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    #[serde(transparent)]
    pub struct ChannelPermissions: u32 {
        /// Permission to edit the channel (ACLs, properties)
        const WRITE             = 0x0001;
        /// Permission to traverse the channel on the way to sub-channels
        const TRAVERSE          = 0x0002;
        /// Permission to enter the channel
        const ENTER             = 0x0004;
        /// Permission to speak in the channel
        const SPEAK             = 0x0008;
        /// Permission to mute and deafen other users
        const MUTE_DEAFEN       = 0x0010;
        /// Permission to move users out of the channel
        const MOVE              = 0x0020;
        /// Permission to create sub-channels
        const MAKE_CHANNEL      = 0x0040;
        /// Permission to link the channel to other channels
        const LINK_CHANNEL      = 0x0080;
        /// Permission to whisper into the channel from outside
        const WHISPER           = 0x0100;
        /// Permission to send text messages
        const TEXT_MESSAGE      = 0x0200;
        /// Permission to create temporary sub-channels
        const MAKE_TEMP_CHANNEL = 0x0400;
        /// Permission to kick users from the server
        const KICK              = 0x0800;
        /// Permission to ban users from the server
        const BAN               = 0x1000;
        /// Permission to register other users on the server
        const REGISTER          = 0x2000;
        /// Permission to register oneself on the server
        const SELF_REGISTER     = 0x4000;
    }
}

impl ChannelPermissions {
    // === Preset tiers ===

    /// Full administrative access: every defined capability.
    pub const ROLE_ADMIN: Self = Self::all();

    /// Moderator tier: voice moderation and channel management, but no
    /// channel edit, ban, or registration rights. The gap versus
    /// [`Self::ROLE_ADMIN`] is intentional tiering, not an omission.
    pub const ROLE_MODERATOR: Self = Self::TRAVERSE
        .union(Self::ENTER)
        .union(Self::SPEAK)
        .union(Self::MUTE_DEAFEN)
        .union(Self::MOVE)
        .union(Self::MAKE_CHANNEL)
        .union(Self::WHISPER)
        .union(Self::TEXT_MESSAGE)
        .union(Self::MAKE_TEMP_CHANNEL)
        .union(Self::KICK);

    /// Regular member tier: join, talk, whisper, and text chat.
    pub const ROLE_USER: Self = Self::TRAVERSE
        .union(Self::ENTER)
        .union(Self::SPEAK)
        .union(Self::WHISPER)
        .union(Self::TEXT_MESSAGE);

    /// Guest tier: like a member but without whisper.
    pub const ROLE_GUEST: Self = Self::TRAVERSE
        .union(Self::ENTER)
        .union(Self::SPEAK)
        .union(Self::TEXT_MESSAGE);

    /// Check if this permission set includes the specified permission(s).
    #[must_use]
    pub const fn has(self, permission: Self) -> bool {
        self.contains(permission)
    }

    /// Stable bit-to-name mapping for display and CLI output.
    #[must_use]
    pub const fn named_bits() -> &'static [(Self, &'static str)] {
        &[
            (Self::WRITE, "write"),
            (Self::TRAVERSE, "traverse"),
            (Self::ENTER, "enter"),
            (Self::SPEAK, "speak"),
            (Self::MUTE_DEAFEN, "mute_deafen"),
            (Self::MOVE, "move"),
            (Self::MAKE_CHANNEL, "make_channel"),
            (Self::LINK_CHANNEL, "link_channel"),
            (Self::WHISPER, "whisper"),
            (Self::TEXT_MESSAGE, "text_message"),
            (Self::MAKE_TEMP_CHANNEL, "make_temp_channel"),
            (Self::KICK, "kick"),
            (Self::BAN, "ban"),
            (Self::REGISTER, "register"),
            (Self::SELF_REGISTER, "self_register"),
        ]
    }
}

impl Default for ChannelPermissions {
    fn default() -> Self {
        Self::empty()
    }
}

/// An allow/deny mask pair for one ACL entry.
///
/// Disjoint by construction: deny bits are stripped from the allow mask, so
/// `allow & deny == 0` holds for every bundle that exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PermissionBundle {
    pub allow: ChannelPermissions,
    pub deny: ChannelPermissions,
}

impl PermissionBundle {
    /// Build a bundle, resolving overlaps in favour of deny.
    #[must_use]
    pub const fn new(allow: ChannelPermissions, deny: ChannelPermissions) -> Self {
        Self {
            allow: allow.difference(deny),
            deny,
        }
    }

    /// Bundle that grants the given bits and denies nothing.
    #[must_use]
    pub const fn grant(allow: ChannelPermissions) -> Self {
        Self {
            allow,
            deny: ChannelPermissions::empty(),
        }
    }

    #[must_use]
    pub const fn is_disjoint(self) -> bool {
        self.allow.intersection(self.deny).is_empty()
    }
}

/// Where a bundle is applied on the remote server.
///
/// `Global` maps to the root channel (id 0); the named scopes are resolved
/// to concrete channel ids by the sync engine at apply time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    Global,
    Corporation,
    Fleet,
}

impl PermissionScope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Corporation => "corporation",
            Self::Fleet => "fleet",
        }
    }
}
