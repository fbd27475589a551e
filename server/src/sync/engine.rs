//! The synchronization pass.
//!
//! A pass reads a fresh identity snapshot, resolves each identity's role,
//! and writes the resulting ACL entry to the channel the role's scope maps
//! to. One identity failing is recorded and the pass moves on; only a
//! snapshot failure aborts a pass.

use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{desired_display_name, AccountStore, SyncMode, SyncOutcome, SyncReport, SyncResult};
use crate::gateway::{GatewayError, MurmurControl};
use crate::identity::{resolve, AdminAllowlist, Affiliation, IdentityProvider, LinkedIdentity};
use crate::permissions::PermissionScope;

/// Channel id of the server root; global-scope bundles land here.
const ROOT_CHANNEL: i32 = 0;

/// Channel fleet-scope bundles land in.
const FLEET_CHANNEL: &str = "Fleet Operations";

pub struct SyncEngine {
    gateway: Arc<dyn MurmurControl>,
    provider: Arc<dyn IdentityProvider>,
    accounts: Arc<dyn AccountStore>,
    auto_create_channels: bool,
    /// Serializes channel creation per channel name so concurrent passes
    /// cannot create duplicates.
    channel_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn MurmurControl>,
        provider: Arc<dyn IdentityProvider>,
        accounts: Arc<dyn AccountStore>,
        auto_create_channels: bool,
    ) -> Self {
        Self {
            gateway,
            provider,
            accounts,
            auto_create_channels,
            channel_locks: DashMap::new(),
        }
    }

    /// Run a full pass over every linked identity.
    pub async fn sync_all(&self, allowlist: &AdminAllowlist, mode: SyncMode) -> Result<SyncReport> {
        let linked = self.provider.list_registered().await?;
        info!(
            count = linked.len(),
            dry_run = mode.is_dry_run(),
            "starting permission sync pass"
        );

        let mut report = SyncReport::default();
        for entry in linked {
            report.push(self.sync_linked(&entry, allowlist, mode).await);
        }

        info!(
            updated = report.updated,
            planned = report.planned,
            errors = report.errors,
            "permission sync pass finished"
        );
        Ok(report)
    }

    /// Sync a single identity by host account id. `Ok(None)` means the
    /// account has no linked voice registration.
    pub async fn sync_one(
        &self,
        user_id: i64,
        allowlist: &AdminAllowlist,
        mode: SyncMode,
    ) -> Result<Option<SyncResult>> {
        let Some(entry) = self.provider.find_by_id(user_id).await? else {
            return Ok(None);
        };
        Ok(Some(self.sync_linked(&entry, allowlist, mode).await))
    }

    async fn sync_linked(
        &self,
        entry: &LinkedIdentity,
        allowlist: &AdminAllowlist,
        mode: SyncMode,
    ) -> SyncResult {
        let identity = &entry.identity;
        let resolution = resolve(identity, allowlist);

        let result = |channel_id: i32, outcome: SyncOutcome| SyncResult {
            user_id: identity.id,
            name: identity.name.clone(),
            role: resolution.role,
            channel_id,
            outcome,
        };

        let remote_id = match self.remote_id_for(entry, mode).await {
            Ok(id) => id,
            Err(message) => {
                warn!(user_id = identity.id, %message, "skipping identity");
                return result(ROOT_CHANNEL, SyncOutcome::Failed(message));
            }
        };

        let channel_id = self
            .channel_for(resolution.scope, identity.main_character.as_ref(), mode)
            .await;

        if mode.is_dry_run() {
            debug!(
                user_id = identity.id,
                role = %resolution.role,
                channel_id,
                "dry run, would write ACL entry"
            );
            return result(channel_id, SyncOutcome::Planned);
        }

        if let Err(e) = self
            .gateway
            .set_user_permissions(remote_id, channel_id, resolution.bundle)
            .await
        {
            warn!(user_id = identity.id, error = %e, "failed to write permissions");
            return result(channel_id, SyncOutcome::Failed(e.to_string()));
        }

        // Name reconciliation is best-effort; a collision on the voice
        // server must not undo the permission write above.
        let desired = desired_display_name(identity);
        if let Err(e) = self.gateway.update_display_name(remote_id, &desired).await {
            match e {
                GatewayError::DuplicateUser { .. } | GatewayError::InvalidUsername(_) => {
                    warn!(user_id = identity.id, %desired, error = %e, "display name not applied");
                }
                other => {
                    return result(channel_id, SyncOutcome::Failed(other.to_string()));
                }
            }
        }

        debug!(
            user_id = identity.id,
            role = %resolution.role,
            channel_id,
            "permissions written"
        );
        result(channel_id, SyncOutcome::Updated)
    }

    /// The remote registration id for an account, looked up by name when
    /// the link has not recorded one yet. The learned id is persisted so
    /// later passes skip the lookup.
    async fn remote_id_for(&self, entry: &LinkedIdentity, mode: SyncMode) -> Result<i32, String> {
        if let Some(id) = entry.account.murmur_user_id {
            return Ok(id);
        }

        let found = self
            .gateway
            .find_registered(&entry.account.murmur_username)
            .await
            .map_err(|e| format!("registration lookup failed: {e}"))?;

        let Some(user) = found else {
            return Err(format!(
                "'{}' is not registered on the voice server",
                entry.account.murmur_username
            ));
        };

        if !mode.is_dry_run() {
            if let Err(e) = self.accounts.set_remote_id(entry.identity.id, user.id).await {
                warn!(user_id = entry.identity.id, error = %e, "could not persist remote id");
            }
        }
        Ok(user.id)
    }

    /// Map a permission scope onto a channel id.
    ///
    /// Missing channels fall back to the root channel rather than failing
    /// the identity; a narrower grant in a broader place is safe because
    /// bundles never widen with scope.
    async fn channel_for(
        &self,
        scope: PermissionScope,
        affiliation: Option<&Affiliation>,
        mode: SyncMode,
    ) -> i32 {
        let name = match scope {
            PermissionScope::Global => return ROOT_CHANNEL,
            PermissionScope::Fleet => FLEET_CHANNEL.to_string(),
            PermissionScope::Corporation => {
                match affiliation.and_then(corporation_channel_name) {
                    Some(name) => name,
                    None => {
                        debug!("corporation channel name unavailable, using root");
                        return ROOT_CHANNEL;
                    }
                }
            }
        };

        match self.ensure_channel(&name, mode).await {
            Ok(id) => id,
            Err(e) => {
                warn!(channel = %name, error = %e, "channel unavailable, using root");
                ROOT_CHANNEL
            }
        }
    }

    async fn ensure_channel(&self, name: &str, mode: SyncMode) -> Result<i32, GatewayError> {
        let lock = self
            .channel_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let channels = self.gateway.channels().await?;
        if let Some(channel) = channels.iter().find(|c| c.name == name) {
            return Ok(channel.id);
        }

        if !self.auto_create_channels || mode.is_dry_run() {
            return Err(GatewayError::NotFound(format!("channel '{name}'")));
        }

        let id = self.gateway.create_channel(name, ROOT_CHANNEL).await?;
        info!(channel = %name, id, "created scope channel");
        Ok(id)
    }
}

/// `[TICKER] Corporation Name`, or `None` when either half is unknown.
fn corporation_channel_name(affiliation: &Affiliation) -> Option<String> {
    let ticker = affiliation.corporation_ticker.as_deref()?;
    let name = affiliation.corporation_name.as_deref()?;
    Some(format!("[{ticker}] {name}"))
}
