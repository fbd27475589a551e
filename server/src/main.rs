//! Murmur Bridge Server - Main Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use mb_server::auth::{AuthService, PgAuthStore};
use mb_server::db::PgAccountStore;
use mb_server::gateway::{connect_or_warn, HttpTransport, MurmurControl, MurmurGateway};
use mb_server::identity::PgIdentityProvider;
use mb_server::sync::SyncEngine;
use mb_server::{api, config, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mb_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Murmur Bridge Server"
    );

    // Initialize database
    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;

    // Gateway to the voice server control endpoint. An unreachable voice
    // server is survivable; the bridge serves status and auth config while
    // it is down.
    let transport = HttpTransport::new(
        &config.ice_host,
        config.ice_port,
        config.ice_secret.clone(),
        Duration::from_secs(config.ice_timeout_secs),
    )?;
    let gateway: Arc<dyn MurmurControl> = Arc::new(MurmurGateway::new(
        transport,
        config.server_id,
        Duration::from_secs(config.ice_timeout_secs),
    ));
    connect_or_warn(&gateway).await;

    let provider = Arc::new(PgIdentityProvider::new(db_pool.clone()));
    let accounts = Arc::new(PgAccountStore::new(db_pool.clone()));
    let auth_store = Arc::new(PgAuthStore::new(db_pool.clone()));

    let auth = Arc::new(AuthService::new(
        auth_store,
        gateway.clone(),
        config.enable_custom_auth,
        config.server_password.clone(),
    ));
    let engine = Arc::new(SyncEngine::new(
        gateway.clone(),
        provider,
        accounts,
        config.auto_create_channels,
    ));

    let allowlist = db::load_allowlist(&db_pool, &config.admin_users).await?;
    info!(entries = allowlist.len(), "admin allow-list loaded");

    // Build application state and router
    let state = api::AppState::new(db_pool, config.clone(), gateway.clone(), auth, engine, allowlist);
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    gateway.disconnect().await;
    info!("Server shutdown complete");

    Ok(())
}
