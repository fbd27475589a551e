//! Reusable test doubles for the sync and auth integration tests.
//!
//! `RecordingGateway` implements the full control trait against in-memory
//! state and counts every mutating call, so tests can assert that dry runs
//! stay read-only and that failures are contained.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use mb_server::db::MurmurAccount;
use mb_server::gateway::{
    AclEntry, ChannelAcl, ChannelInfo, GatewayError, GatewayResult, MurmurControl, OnlineUser,
    ServerSummary, UserRecord,
};
use mb_server::identity::{Affiliation, Identity, IdentityProvider, LinkedIdentity};
use mb_server::permissions::PermissionBundle;
use mb_server::sync::AccountStore;

/// In-memory [`MurmurControl`] double with mutation counters.
#[derive(Default)]
pub struct RecordingGateway {
    pub users: Mutex<HashMap<i32, UserRecord>>,
    pub channels: Mutex<Vec<ChannelInfo>>,
    pub acls: Mutex<HashMap<i32, ChannelAcl>>,
    /// Registration ids whose permission writes fail.
    pub fail_permissions: Mutex<Vec<i32>>,
    pub mutations: AtomicU32,
    pub permission_writes: AtomicU32,
    pub channel_creates: AtomicU32,
    pub name_updates: AtomicU32,
    pub auth_flags: Mutex<Vec<(String, bool)>>,
    next_id: AtomicU32,
    connected: AtomicBool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        let gateway = Self {
            next_id: AtomicU32::new(100),
            ..Self::default()
        };
        gateway.connected.store(true, Ordering::SeqCst);
        gateway
    }

    pub fn with_registered(self, id: i32, name: &str) -> Self {
        self.users.lock().unwrap().insert(
            id,
            UserRecord {
                id,
                name: name.to_string(),
                email: String::new(),
                last_active: None,
            },
        );
        self
    }

    pub fn with_channel(self, id: i32, name: &str) -> Self {
        self.channels.lock().unwrap().push(ChannelInfo {
            id,
            name: name.to_string(),
            parent: 0,
            description: String::new(),
            temporary: false,
            position: 0,
        });
        self
    }

    pub fn failing_permissions_for(self, user_id: i32) -> Self {
        self.fail_permissions.lock().unwrap().push(user_id);
        self
    }

    pub fn mutation_count(&self) -> u32 {
        self.mutations.load(Ordering::SeqCst)
    }

    /// The ACL entry written for a registration id, across channels.
    pub fn acl_entry_for(&self, user_id: i32) -> Option<(i32, AclEntry)> {
        let acls = self.acls.lock().unwrap();
        for (channel_id, acl) in acls.iter() {
            if let Some(entry) = acl.entries.iter().find(|e| e.user_id == user_id) {
                return Some((*channel_id, entry.clone()));
            }
        }
        None
    }

    pub fn channel_named(&self, name: &str) -> Option<ChannelInfo> {
        self.channels
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }
}

#[async_trait]
impl MurmurControl for RecordingGateway {
    async fn connect(&self) -> GatewayResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn ping(&self) -> GatewayResult<()> {
        Ok(())
    }

    async fn server_summary(&self) -> GatewayResult<ServerSummary> {
        Ok(ServerSummary {
            id: 1,
            name: "test".to_string(),
            port: 64738,
            users_online: 0,
            channel_count: self.channels.lock().unwrap().len() as u32,
            max_users: 100,
            version: "1.5.0".to_string(),
        })
    }

    async fn create_user(&self, name: &str, _password: &str, _email: &str) -> GatewayResult<i32> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i32;
        self.users.lock().unwrap().insert(
            id,
            UserRecord {
                id,
                name: name.to_string(),
                email: String::new(),
                last_active: None,
            },
        );
        Ok(id)
    }

    async fn delete_user(&self, user_id: i32) -> GatewayResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.users.lock().unwrap().remove(&user_id);
        Ok(())
    }

    async fn user_info(&self, user_id: i32) -> GatewayResult<Option<UserRecord>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn find_registered(&self, name: &str) -> GatewayResult<Option<UserRecord>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.name == name)
            .cloned())
    }

    async fn update_user_password(&self, _user_id: i32, _password: &str) -> GatewayResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_display_name(&self, user_id: i32, name: &str) -> GatewayResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.name_updates.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| GatewayError::NotFound(format!("user {user_id}")))?;
        user.name = name.to_string();
        Ok(())
    }

    async fn online_users(&self) -> GatewayResult<Vec<OnlineUser>> {
        Ok(Vec::new())
    }

    async fn channels(&self) -> GatewayResult<Vec<ChannelInfo>> {
        Ok(self.channels.lock().unwrap().clone())
    }

    async fn create_channel(&self, name: &str, parent: i32) -> GatewayResult<i32> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.channel_creates.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i32;
        self.channels.lock().unwrap().push(ChannelInfo {
            id,
            name: name.to_string(),
            parent,
            description: String::new(),
            temporary: false,
            position: 0,
        });
        Ok(id)
    }

    async fn move_user(&self, _session: i32, _channel_id: i32) -> GatewayResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn kick_user(&self, _session: i32, _reason: &str) -> GatewayResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_acl(&self, channel_id: i32) -> GatewayResult<ChannelAcl> {
        Ok(self
            .acls
            .lock()
            .unwrap()
            .get(&channel_id)
            .cloned()
            .unwrap_or(ChannelAcl {
                channel_id,
                inherit_acls: true,
                entries: Vec::new(),
            }))
    }

    async fn set_acl(&self, acl: &ChannelAcl) -> GatewayResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.acls
            .lock()
            .unwrap()
            .insert(acl.channel_id, acl.clone());
        Ok(())
    }

    async fn set_user_permissions(
        &self,
        user_id: i32,
        channel_id: i32,
        bundle: PermissionBundle,
    ) -> GatewayResult<()> {
        if self.fail_permissions.lock().unwrap().contains(&user_id) {
            return Err(GatewayError::Remote("injected failure".to_string()));
        }

        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.permission_writes.fetch_add(1, Ordering::SeqCst);
        let mut acls = self.acls.lock().unwrap();
        let acl = acls.entry(channel_id).or_insert(ChannelAcl {
            channel_id,
            inherit_acls: true,
            entries: Vec::new(),
        });
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
        Ok(())
    }

    async fn set_user_authenticated(
        &self,
        username: &str,
        authenticated: bool,
    ) -> GatewayResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.auth_flags
            .lock()
            .unwrap()
            .push((username.to_string(), authenticated));
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Fixed-snapshot [`IdentityProvider`] double.
#[derive(Default)]
pub struct StubProvider {
    pub entries: Vec<LinkedIdentity>,
}

impl StubProvider {
    pub fn new(entries: Vec<LinkedIdentity>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn list_registered(&self) -> Result<Vec<LinkedIdentity>> {
        Ok(self.entries.clone())
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<LinkedIdentity>> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.identity.id == user_id)
            .cloned())
    }
}

/// In-memory [`AccountStore`] double recording writes.
#[derive(Default)]
pub struct MemoryAccounts {
    pub remote_ids: Mutex<HashMap<i64, i32>>,
    pub writes: AtomicU32,
}

#[async_trait]
impl AccountStore for MemoryAccounts {
    async fn set_remote_id(&self, user_id: i64, murmur_user_id: i32) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.remote_ids
            .lock()
            .unwrap()
            .insert(user_id, murmur_user_id);
        Ok(())
    }
}

/// A plain member identity linked to a voice account of the same name.
pub fn linked_member(user_id: i64, name: &str, remote_id: Option<i32>) -> LinkedIdentity {
    let now = Utc::now();
    LinkedIdentity {
        identity: Identity {
            id: user_id,
            name: name.to_string(),
            nickname: None,
            superuser: false,
            roles: Vec::new(),
            main_character: None,
        },
        account: MurmurAccount {
            user_id,
            murmur_username: name.to_string(),
            murmur_user_id: remote_id,
            nickname: None,
            created_at: now,
            updated_at: now,
        },
    }
}

/// Attach a main character in `[TEST] Test Corp` to a linked identity.
pub fn with_affiliation(
    mut linked: LinkedIdentity,
    character_id: i64,
    ceo_id: Option<i64>,
    titles: &[&str],
) -> LinkedIdentity {
    linked.identity.main_character = Some(Affiliation {
        character_id,
        character_name: format!("{} Prime", linked.identity.name),
        corporation_id: 100,
        corporation_name: Some("Test Corp".to_string()),
        corporation_ticker: Some("TEST".to_string()),
        corporation_ceo_id: ceo_id,
        alliance_id: None,
        titles: titles.iter().map(ToString::to_string).collect(),
    });
    linked
}
