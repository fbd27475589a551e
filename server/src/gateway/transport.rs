//! Transport seam for the Murmur administrative interface.
//!
//! The wire protocol itself is an external concern; everything protocol
//! specific lives behind [`MetaTransport`] so the gateway semantics can be
//! exercised against an in-memory implementation and the production
//! transport can be swapped without touching callers.

use async_trait::async_trait;

use super::error::GatewayResult;
use super::types::{
    ChannelAcl, ChannelInfo, NewChannel, NewRegistration, OnlineUser, ServerSummary, UserRecord,
};

/// Low-level operations exposed by the remote Meta service and its
/// per-server administrative objects.
#[async_trait]
pub trait MetaTransport: Send + Sync {
    /// Liveness check against the Meta service. Runs under the configured
    /// secret, so it doubles as the authentication handshake.
    async fn ping_meta(&self) -> GatewayResult<()>;

    /// Enumerate the ids of all booted virtual servers.
    async fn list_servers(&self) -> GatewayResult<Vec<i32>>;

    /// Liveness check against one virtual server.
    async fn ping_server(&self, server_id: i32) -> GatewayResult<()>;

    async fn server_summary(&self, server_id: i32) -> GatewayResult<ServerSummary>;

    /// Registered users whose name contains `filter`; empty filter lists
    /// everyone.
    async fn registered_users(&self, server_id: i32, filter: &str)
        -> GatewayResult<Vec<UserRecord>>;

    /// Fetch one registration, `None` when the id is unknown.
    async fn get_registration(
        &self,
        server_id: i32,
        user_id: i32,
    ) -> GatewayResult<Option<UserRecord>>;

    /// Create a registration, returning the new remote user id.
    async fn register_user(&self, server_id: i32, reg: &NewRegistration) -> GatewayResult<i32>;

    async fn update_registration(
        &self,
        server_id: i32,
        user_id: i32,
        reg: &NewRegistration,
    ) -> GatewayResult<()>;

    async fn unregister_user(&self, server_id: i32, user_id: i32) -> GatewayResult<()>;

    async fn online_users(&self, server_id: i32) -> GatewayResult<Vec<OnlineUser>>;

    async fn channels(&self, server_id: i32) -> GatewayResult<Vec<ChannelInfo>>;

    /// Create a channel, returning the new channel id.
    async fn add_channel(&self, server_id: i32, channel: &NewChannel) -> GatewayResult<i32>;

    /// Move an online user (by session) into a channel.
    async fn move_session(
        &self,
        server_id: i32,
        session: i32,
        channel_id: i32,
    ) -> GatewayResult<()>;

    /// Kick an online user (by session) with a reason shown to them.
    async fn kick_session(&self, server_id: i32, session: i32, reason: &str) -> GatewayResult<()>;

    async fn get_acl(&self, server_id: i32, channel_id: i32) -> GatewayResult<ChannelAcl>;

    async fn set_acl(&self, server_id: i32, acl: &ChannelAcl) -> GatewayResult<()>;

    /// Flip the bridge-side authenticated flag for a username.
    async fn set_authenticated(
        &self,
        server_id: i32,
        username: &str,
        authenticated: bool,
    ) -> GatewayResult<()>;
}
