//! API Router and Application State
//!
//! Central routing configuration and shared state.

mod error;
mod handlers;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult, ErrorResponse};

use crate::auth::AuthService;
use crate::config::Config;
use crate::gateway::MurmurControl;
use crate::identity::AdminAllowlist;
use crate::sync::SyncEngine;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Server configuration
    pub config: Arc<Config>,
    /// Voice server control gateway
    pub gateway: Arc<dyn MurmurControl>,
    /// Authentication fallback service
    pub auth: Arc<AuthService>,
    /// Permission synchronization engine
    pub engine: Arc<SyncEngine>,
    /// Admin allow-list, persisted to settings on change
    pub allowlist: Arc<RwLock<AdminAllowlist>>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        db: PgPool,
        config: Config,
        gateway: Arc<dyn MurmurControl>,
        auth: Arc<AuthService>,
        engine: Arc<SyncEngine>,
        allowlist: AdminAllowlist,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            gateway,
            auth,
            engine,
            allowlist: Arc::new(RwLock::new(allowlist)),
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/auth/check", post(handlers::auth_check))
        .route("/auth/password", post(handlers::set_password))
        .route("/auth/password/{username}", delete(handlers::remove_password))
        .route("/auth/passwords", get(handlers::list_passwords))
        .route("/sync", post(handlers::run_sync))
        .route("/sync/{user_id}", post(handlers::run_sync_one))
        .route(
            "/allowlist",
            get(handlers::allowlist_list).post(handlers::allowlist_add),
        )
        .route("/allowlist/{entry}", delete(handlers::allowlist_remove))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
