//! HTTP Handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::auth::{AuthOutcome, AuthRecord};
use crate::db;
use crate::gateway::ServerSummary;
use crate::sync::{SyncMode, SyncReport, SyncResult};

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub connected: bool,
    pub murmur_host: String,
    pub murmur_port: u16,
    pub server: Option<ServerSummary>,
}

/// Gateway connection status and server summary.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    // A dead gateway is a reportable state here, not an error.
    if !state.gateway.is_connected() {
        let _ = state.gateway.connect().await;
    }

    let server = if state.gateway.ping().await.is_ok() {
        state.gateway.server_summary().await.ok()
    } else {
        None
    };

    Json(StatusResponse {
        connected: server.is_some(),
        murmur_host: state.config.murmur_host.clone(),
        murmur_port: state.config.murmur_port,
        server,
    })
}

#[derive(Debug, Deserialize)]
pub struct AuthCheckRequest {
    pub username: String,
    pub password: String,
}

/// Decide an authentication attempt. Always 200; the verdict is in the
/// body so the voice server's auth hook can act on it directly.
pub async fn auth_check(
    State(state): State<AppState>,
    Json(body): Json<AuthCheckRequest>,
) -> Json<AuthOutcome> {
    Json(state.auth.authenticate(&body.username, &body.password).await)
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub username: String,
    pub password: String,
}

pub async fn set_password(
    State(state): State<AppState>,
    Json(body): Json<SetPasswordRequest>,
) -> ApiResult<StatusCode> {
    state
        .auth
        .set_password(&body.username, &body.password)
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_password(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    if state.auth.remove_password(&username).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "no personal password for '{username}'"
        )))
    }
}

pub async fn list_passwords(State(state): State<AppState>) -> ApiResult<Json<Vec<AuthRecord>>> {
    Ok(Json(state.auth.list_records().await?))
}

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    #[serde(default)]
    pub dry_run: bool,
}

/// Run a full synchronization pass.
pub async fn run_sync(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> ApiResult<Json<SyncReport>> {
    let mode = if query.dry_run {
        SyncMode::DryRun
    } else {
        SyncMode::Apply
    };
    let allowlist = state.allowlist.read().await.clone();
    let report = state.engine.sync_all(&allowlist, mode).await?;
    Ok(Json(report))
}

/// Sync one identity by host account id.
pub async fn run_sync_one(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<SyncQuery>,
) -> ApiResult<Json<SyncResult>> {
    let mode = if query.dry_run {
        SyncMode::DryRun
    } else {
        SyncMode::Apply
    };
    let allowlist = state.allowlist.read().await.clone();
    let result = state
        .engine
        .sync_one(user_id, &allowlist, mode)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("account {user_id} has no linked voice registration"))
        })?;
    Ok(Json(result))
}

pub async fn allowlist_list(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.allowlist.read().await.entries().to_vec())
}

#[derive(Debug, Deserialize)]
pub struct AllowlistEntry {
    pub entry: String,
}

pub async fn allowlist_add(
    State(state): State<AppState>,
    Json(body): Json<AllowlistEntry>,
) -> ApiResult<Json<Vec<String>>> {
    if body.entry.trim().is_empty() {
        return Err(ApiError::Validation("entry must not be empty".to_string()));
    }

    let mut allowlist = state.allowlist.write().await;
    allowlist.add(&body.entry);
    db::save_allowlist(&state.db, &allowlist).await?;
    info!(entry = %body.entry.trim(), "allow-list entry added");
    Ok(Json(allowlist.entries().to_vec()))
}

pub async fn allowlist_remove(
    State(state): State<AppState>,
    Path(entry): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let mut allowlist = state.allowlist.write().await;
    if !allowlist.remove(&entry) {
        return Err(ApiError::NotFound(format!("allow-list entry '{entry}'")));
    }
    db::save_allowlist(&state.db, &allowlist).await?;
    info!(entry = %entry, "allow-list entry removed");
    Ok(Json(allowlist.entries().to_vec()))
}
