//! Wire types for the Murmur administrative interface.

use serde::{Deserialize, Serialize};

/// A registered user on the voice server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Last activity timestamp as reported by the server, if any.
    #[serde(default)]
    pub last_active: Option<String>,
}

/// Fields for creating or updating a registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRegistration {
    pub name: String,
    /// Registration password; empty string leaves it unchanged on update.
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

/// A user currently connected to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUser {
    /// Transient session id for this connection.
    pub session: i32,
    /// Registered user id, or -1 for unregistered connections.
    #[serde(default = "unregistered")]
    pub user_id: i32,
    pub name: String,
    /// Channel the user currently sits in.
    #[serde(default)]
    pub channel: i32,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub online_secs: i64,
}

const fn unregistered() -> i32 {
    -1
}

/// A channel on the voice server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: i32,
    pub name: String,
    /// Parent channel id; -1 for the root channel itself.
    #[serde(default)]
    pub parent: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub temporary: bool,
    #[serde(default)]
    pub position: i32,
}

/// Fields for creating a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChannel {
    pub name: String,
    pub parent: i32,
    #[serde(default)]
    pub description: String,
}

/// One entry of a channel ACL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    /// Whether the entry applies to the channel itself.
    pub apply_here: bool,
    /// Whether the entry applies to sub-channels.
    pub apply_subs: bool,
    /// True for entries inherited from a parent channel; inherited entries
    /// are never written back.
    #[serde(default)]
    pub inherited: bool,
    /// Registered user id this entry targets, or -1 when it targets a group.
    pub user_id: i32,
    /// Group name this entry targets; empty when it targets a user.
    #[serde(default)]
    pub group: String,
    pub allow: u32,
    pub deny: u32,
}

/// The full ACL of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAcl {
    pub channel_id: i32,
    pub inherit_acls: bool,
    pub entries: Vec<AclEntry>,
}

/// Summary of a virtual server instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSummary {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub users_online: u32,
    #[serde(default)]
    pub channel_count: u32,
    #[serde(default)]
    pub max_users: u32,
    #[serde(default)]
    pub version: String,
}
