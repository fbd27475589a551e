//! High-level control gateway over a [`MetaTransport`].
//!
//! Owns the session lifecycle: the secret-bearing handshake, the memoized
//! virtual server id, and the hard per-call timeout. Callers never see the
//! transport; they talk to [`MurmurControl`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::{GatewayError, GatewayResult};
use super::transport::MetaTransport;
use super::types::{
    AclEntry, ChannelAcl, ChannelInfo, NewChannel, NewRegistration, OnlineUser, ServerSummary,
    UserRecord,
};
use crate::permissions::PermissionBundle;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9_\-\.\s]+$").unwrap();
}

const MAX_USERNAME_LEN: usize = 255;

/// Operations the rest of the service needs from the voice server.
///
/// Implemented by [`MurmurGateway`] in production and by in-memory stubs in
/// tests.
#[async_trait]
pub trait MurmurControl: Send + Sync {
    /// Establish and verify the control session. Idempotent; a second call
    /// on a live session is a no-op.
    async fn connect(&self) -> GatewayResult<()>;

    fn is_connected(&self) -> bool;

    /// Liveness probe through the established session.
    async fn ping(&self) -> GatewayResult<()>;

    async fn server_summary(&self) -> GatewayResult<ServerSummary>;

    /// Register a user, or return the existing registration id when one
    /// already exists under the exact same name.
    async fn create_user(&self, name: &str, password: &str, email: &str) -> GatewayResult<i32>;

    async fn delete_user(&self, user_id: i32) -> GatewayResult<()>;

    async fn user_info(&self, user_id: i32) -> GatewayResult<Option<UserRecord>>;

    /// Look up a registration by exact name.
    async fn find_registered(&self, name: &str) -> GatewayResult<Option<UserRecord>>;

    async fn update_user_password(&self, user_id: i32, password: &str) -> GatewayResult<()>;

    async fn update_display_name(&self, user_id: i32, name: &str) -> GatewayResult<()>;

    async fn online_users(&self) -> GatewayResult<Vec<OnlineUser>>;

    async fn channels(&self) -> GatewayResult<Vec<ChannelInfo>>;

    async fn create_channel(&self, name: &str, parent: i32) -> GatewayResult<i32>;

    async fn move_user(&self, session: i32, channel_id: i32) -> GatewayResult<()>;

    async fn kick_user(&self, session: i32, reason: &str) -> GatewayResult<()>;

    async fn get_acl(&self, channel_id: i32) -> GatewayResult<ChannelAcl>;

    async fn set_acl(&self, acl: &ChannelAcl) -> GatewayResult<()>;

    /// Write a user-targeted ACL entry on a channel, replacing any previous
    /// entry for the same user on that channel.
    async fn set_user_permissions(
        &self,
        user_id: i32,
        channel_id: i32,
        bundle: PermissionBundle,
    ) -> GatewayResult<()>;

    async fn set_user_authenticated(&self, username: &str, authenticated: bool)
        -> GatewayResult<()>;

    /// Tear the session down. Safe to call when not connected.
    async fn disconnect(&self);
}

/// Production gateway bound to one virtual server.
pub struct MurmurGateway<T: MetaTransport> {
    transport: T,
    server_id: i32,
    call_timeout: Duration,
    connected: AtomicBool,
    /// Serializes connect/disconnect so concurrent callers cannot race the
    /// handshake.
    session_lock: Mutex<()>,
    /// Serializes the ACL read-modify-write per channel; without this two
    /// concurrent writers both read the old ACL and the later write drops
    /// the earlier writer's entry.
    acl_locks: DashMap<i32, Arc<Mutex<()>>>,
}

impl<T: MetaTransport> MurmurGateway<T> {
    pub fn new(transport: T, server_id: i32, call_timeout: Duration) -> Self {
        Self {
            transport,
            server_id,
            call_timeout,
            connected: AtomicBool::new(false),
            session_lock: Mutex::new(()),
            acl_locks: DashMap::new(),
        }
    }

    /// Run a transport call under the hard timeout.
    async fn timed<F, R>(&self, fut: F) -> GatewayResult<R>
    where
        F: std::future::Future<Output = GatewayResult<R>> + Send,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.call_timeout)),
        }
    }

    fn require_connected(&self) -> GatewayResult<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(GatewayError::NotConnected)
        }
    }

    fn validate_username(name: &str) -> GatewayResult<()> {
        if name.is_empty() {
            return Err(GatewayError::InvalidUsername("empty name".to_string()));
        }
        if name.len() > MAX_USERNAME_LEN {
            return Err(GatewayError::InvalidUsername(format!(
                "name exceeds {MAX_USERNAME_LEN} characters"
            )));
        }
        if !USERNAME_RE.is_match(name) {
            return Err(GatewayError::InvalidUsername(format!(
                "name '{name}' contains characters outside [a-zA-Z0-9_-. ]"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: MetaTransport> MurmurControl for MurmurGateway<T> {
    async fn connect(&self) -> GatewayResult<()> {
        let _guard = self.session_lock.lock().await;
        if self.connected.load(Ordering::Acquire) {
            return Ok(());
        }

        // The meta ping runs under the secret, so a bad secret surfaces
        // here instead of on the first real call.
        self.timed(self.transport.ping_meta()).await?;

        let servers = self.timed(self.transport.list_servers()).await?;
        if !servers.contains(&self.server_id) {
            return Err(GatewayError::ConnectionFailed(format!(
                "virtual server {} is not booted (available: {servers:?})",
                self.server_id
            )));
        }
        self.timed(self.transport.ping_server(self.server_id)).await?;

        self.connected.store(true, Ordering::Release);
        info!(server_id = self.server_id, "connected to Murmur control endpoint");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn ping(&self) -> GatewayResult<()> {
        self.require_connected()?;
        self.timed(self.transport.ping_server(self.server_id)).await
    }

    async fn server_summary(&self) -> GatewayResult<ServerSummary> {
        self.require_connected()?;
        self.timed(self.transport.server_summary(self.server_id))
            .await
    }

    async fn create_user(&self, name: &str, password: &str, email: &str) -> GatewayResult<i32> {
        self.require_connected()?;
        Self::validate_username(name)?;

        // Name matching on the server is a substring search; only an exact
        // match counts as the same registration.
        let existing = self
            .timed(self.transport.registered_users(self.server_id, name))
            .await?;
        if let Some(user) = existing.iter().find(|u| u.name == name) {
            debug!(name, id = user.id, "registration already exists");
            return Ok(user.id);
        }

        let reg = NewRegistration {
            name: name.to_string(),
            password: password.to_string(),
            email: email.to_string(),
        };
        let id = self
            .timed(self.transport.register_user(self.server_id, &reg))
            .await?;
        info!(name, id, "registered voice user");
        Ok(id)
    }

    async fn delete_user(&self, user_id: i32) -> GatewayResult<()> {
        self.require_connected()?;
        self.timed(self.transport.unregister_user(self.server_id, user_id))
            .await?;
        info!(user_id, "unregistered voice user");
        Ok(())
    }

    async fn user_info(&self, user_id: i32) -> GatewayResult<Option<UserRecord>> {
        self.require_connected()?;
        self.timed(self.transport.get_registration(self.server_id, user_id))
            .await
    }

    async fn find_registered(&self, name: &str) -> GatewayResult<Option<UserRecord>> {
        self.require_connected()?;
        let matches = self
            .timed(self.transport.registered_users(self.server_id, name))
            .await?;
        Ok(matches.into_iter().find(|u| u.name == name))
    }

    async fn update_user_password(&self, user_id: i32, password: &str) -> GatewayResult<()> {
        self.require_connected()?;
        let current = self
            .timed(self.transport.get_registration(self.server_id, user_id))
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("user {user_id}")))?;

        let reg = NewRegistration {
            name: current.name,
            password: password.to_string(),
            email: current.email,
        };
        self.timed(
            self.transport
                .update_registration(self.server_id, user_id, &reg),
        )
        .await
    }

    async fn update_display_name(&self, user_id: i32, name: &str) -> GatewayResult<()> {
        self.require_connected()?;
        Self::validate_username(name)?;

        let current = self
            .timed(self.transport.get_registration(self.server_id, user_id))
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("user {user_id}")))?;
        if current.name == name {
            return Ok(());
        }

        // Renaming onto an existing registration would merge two accounts.
        let taken = self
            .timed(self.transport.registered_users(self.server_id, name))
            .await?;
        if let Some(holder) = taken.iter().find(|u| u.name == name && u.id != user_id) {
            return Err(GatewayError::DuplicateUser {
                name: name.to_string(),
                id: holder.id,
            });
        }

        let reg = NewRegistration {
            name: name.to_string(),
            password: String::new(),
            email: current.email,
        };
        self.timed(
            self.transport
                .update_registration(self.server_id, user_id, &reg),
        )
        .await?;
        info!(user_id, name, "updated voice display name");
        Ok(())
    }

    async fn online_users(&self) -> GatewayResult<Vec<OnlineUser>> {
        self.require_connected()?;
        self.timed(self.transport.online_users(self.server_id)).await
    }

    async fn channels(&self) -> GatewayResult<Vec<ChannelInfo>> {
        self.require_connected()?;
        self.timed(self.transport.channels(self.server_id)).await
    }

    async fn create_channel(&self, name: &str, parent: i32) -> GatewayResult<i32> {
        self.require_connected()?;
        let channel = NewChannel {
            name: name.to_string(),
            parent,
            description: String::new(),
        };
        let id = self
            .timed(self.transport.add_channel(self.server_id, &channel))
            .await?;
        info!(name, id, parent, "created voice channel");
        Ok(id)
    }

    async fn move_user(&self, session: i32, channel_id: i32) -> GatewayResult<()> {
        self.require_connected()?;
        self.timed(
            self.transport
                .move_session(self.server_id, session, channel_id),
        )
        .await
    }

    async fn kick_user(&self, session: i32, reason: &str) -> GatewayResult<()> {
        self.require_connected()?;
        self.timed(self.transport.kick_session(self.server_id, session, reason))
            .await
    }

    async fn get_acl(&self, channel_id: i32) -> GatewayResult<ChannelAcl> {
        self.require_connected()?;
        self.timed(self.transport.get_acl(self.server_id, channel_id))
            .await
    }

    async fn set_acl(&self, acl: &ChannelAcl) -> GatewayResult<()> {
        self.require_connected()?;
        self.timed(self.transport.set_acl(self.server_id, acl)).await
    }

    async fn set_user_permissions(
        &self,
        user_id: i32,
        channel_id: i32,
        bundle: PermissionBundle,
    ) -> GatewayResult<()> {
        self.require_connected()?;

        let lock = self
            .acl_locks
            .entry(channel_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let mut acl = self
            .timed(self.transport.get_acl(self.server_id, channel_id))
            .await?;

        // Inherited entries come from parent channels and must not be
        // written back, or they would be flattened into this channel.
        acl.entries.retain(|e| !e.inherited);
        acl.entries.retain(|e| e.user_id != user_id);
        acl.entries.push(AclEntry {
            apply_here: true,
            apply_subs: true,
            inherited: false,
            user_id,
            group: String::new(),
            allow: bundle.allow.bits(),
            deny: bundle.deny.bits(),
        });

        self.timed(self.transport.set_acl(self.server_id, &acl)).await
    }

    async fn set_user_authenticated(
        &self,
        username: &str,
        authenticated: bool,
    ) -> GatewayResult<()> {
        self.require_connected()?;
        self.timed(
            self.transport
                .set_authenticated(self.server_id, username, authenticated),
        )
        .await
    }

    async fn disconnect(&self) {
        let _guard = self.session_lock.lock().await;
        if self.connected.swap(false, Ordering::AcqRel) {
            info!(server_id = self.server_id, "disconnected from Murmur control endpoint");
        }
    }
}

/// Connect a gateway, downgrading failure to a warning. The service stays
/// up while the voice server is down; calls fail individually until a later
/// connect succeeds.
pub async fn connect_or_warn(gateway: &Arc<dyn MurmurControl>) {
    if let Err(e) = gateway.connect().await {
        warn!("Murmur control endpoint unavailable at startup: {e}");
    }
}
