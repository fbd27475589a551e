//! Password authentication with fallback.
//!
//! The decision ladder, first match wins:
//!
//! 1. custom authentication disabled: only the shared server password counts
//! 2. shared server password match
//! 3. enabled personal record: the personal password decides
//! 4. otherwise: unknown, one generic message
//!
//! `authenticate` is infallible. Internal failures become an
//! [`AuthType::Error`] outcome with a generic message; detail goes to the
//! log, never to the caller.

use std::sync::Arc;

use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

use super::password::{hash_password, verify_password};
use super::store::{AuthStatus, AuthStore};
use crate::gateway::MurmurControl;
use crate::permissions::{ChannelPermissions, PermissionBundle};

const MIN_PASSWORD_LEN: usize = 8;

/// Which rung of the ladder produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    ServerPassword,
    PersonalPassword,
    /// No method matched the attempt.
    Unknown,
    /// An internal failure prevented a decision.
    Error,
}

/// Result of one authentication attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub auth_type: AuthType,
    /// Whether the bridge-side authenticated flag was set.
    pub authenticated: bool,
    pub message: String,
}

impl AuthOutcome {
    fn failure(auth_type: AuthType, message: &str) -> Self {
        Self {
            success: false,
            auth_type,
            authenticated: false,
            message: message.to_string(),
        }
    }
}

fn server_password_success() -> AuthOutcome {
    AuthOutcome {
        success: true,
        auth_type: AuthType::ServerPassword,
        authenticated: false,
        message: "Authenticated".to_string(),
    }
}

pub struct AuthService {
    store: Arc<dyn AuthStore>,
    gateway: Arc<dyn MurmurControl>,
    enable_custom_auth: bool,
    server_password: Option<String>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AuthStore>,
        gateway: Arc<dyn MurmurControl>,
        enable_custom_auth: bool,
        server_password: Option<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            enable_custom_auth,
            server_password,
        }
    }

    /// Decide one authentication attempt.
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthOutcome {
        if !self.enable_custom_auth {
            debug!(username, "custom authentication disabled, checking server password only");
            return self.check_server_password(username, password);
        }

        if self.matches_server_password(password) {
            info!(username, "authenticated with server password");
            return server_password_success();
        }

        match self.store.find_enabled(username).await {
            Ok(Some(record)) => match verify_password(password, &record.password_hash) {
                Ok(true) => self.personal_success(username).await,
                Ok(false) => {
                    if let Err(e) = self.store.mark_status(username, AuthStatus::Failed).await {
                        warn!(username, error = %e, "could not record failed attempt");
                    }
                    info!(username, "personal password rejected");
                    AuthOutcome::failure(AuthType::PersonalPassword, "Invalid password")
                }
                Err(e) => {
                    error!(username, error = %e, "personal password verification failed");
                    AuthOutcome::failure(AuthType::Error, "Authentication unavailable")
                }
            },
            // Same message as a wrong password; the response must not
            // reveal which names have personal records.
            Ok(None) => AuthOutcome::failure(AuthType::Unknown, "Invalid password"),
            Err(e) => {
                error!(username, error = %e, "auth store lookup failed");
                AuthOutcome::failure(AuthType::Error, "Authentication unavailable")
            }
        }
    }

    fn matches_server_password(&self, password: &str) -> bool {
        self.server_password
            .as_deref()
            .is_some_and(|sp| password.as_bytes().ct_eq(sp.as_bytes()).into())
    }

    fn check_server_password(&self, username: &str, password: &str) -> AuthOutcome {
        if self.server_password.is_none() {
            return AuthOutcome::failure(AuthType::Unknown, "No authentication method available");
        }
        if self.matches_server_password(password) {
            info!(username, "authenticated with server password");
            server_password_success()
        } else {
            AuthOutcome::failure(AuthType::Unknown, "Invalid password")
        }
    }

    /// Book-keeping after a personal password match. Only the decision
    /// itself is load-bearing; every side effect here degrades to a log
    /// line on failure.
    async fn personal_success(&self, username: &str) -> AuthOutcome {
        info!(username, "authenticated with personal password");

        if let Err(e) = self.store.touch_login(username).await {
            warn!(username, error = %e, "could not record login time");
        }
        if let Err(e) = self
            .store
            .mark_status(username, AuthStatus::Authenticated)
            .await
        {
            warn!(username, error = %e, "could not update auth status");
        }

        let mut authenticated = false;
        match self.gateway.set_user_authenticated(username, true).await {
            Ok(()) => authenticated = true,
            Err(e) => warn!(username, error = %e, "could not flag session authenticated"),
        }

        // Personal-password users get the guest floor on the root channel;
        // the next sync pass widens it if a role applies.
        match self.gateway.find_registered(username).await {
            Ok(Some(user)) => {
                let bundle = PermissionBundle::grant(ChannelPermissions::ROLE_GUEST);
                if let Err(e) = self.gateway.set_user_permissions(user.id, 0, bundle).await {
                    warn!(username, error = %e, "could not apply guest permissions");
                }
            }
            Ok(None) => debug!(username, "no registration, skipping guest permissions"),
            Err(e) => warn!(username, error = %e, "registration lookup failed"),
        }

        AuthOutcome {
            success: true,
            auth_type: AuthType::PersonalPassword,
            authenticated,
            message: "Authenticated".to_string(),
        }
    }

    /// Set or replace a personal password.
    pub async fn set_password(&self, username: &str, password: &str) -> anyhow::Result<()> {
        if username.trim().is_empty() {
            anyhow::bail!("username must not be empty");
        }
        if password.len() < MIN_PASSWORD_LEN {
            anyhow::bail!("password must be at least {MIN_PASSWORD_LEN} characters");
        }

        let hash = hash_password(password)?;
        self.store.upsert(username, &hash).await?;
        info!(username, "personal password set");
        Ok(())
    }

    /// Remove a personal password; false when none existed. Authentication
    /// for the name falls back to the server password afterwards.
    pub async fn remove_password(&self, username: &str) -> anyhow::Result<bool> {
        let removed = self.store.delete(username).await?;
        if removed {
            info!(username, "personal password removed");
        }
        Ok(removed)
    }

    pub async fn list_records(&self) -> anyhow::Result<Vec<super::store::AuthRecord>> {
        self.store.list().await
    }
}
