//! HTTP liveness boundary: the companion pings here, the command gate reads
//! the table those pings feed.

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{SecondsFormat, Utc};
use hush_core::presence::SharedPresence;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub const API_KEY_HEADER: &str = "x-api-key";

pub struct ApiState {
    pub api_key: String,
    pub presence: SharedPresence,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ping/{identity}", post(handle_ping))
        .route("/check/{identity}", get(handle_check))
        .with_state(state)
}

pub async fn serve(state: Arc<ApiState>, bind_addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind api server on {bind_addr}"))?;
    info!(addr = %bind_addr, "api server listening");
    axum::serve(listener, router(state))
        .await
        .context("api server exited unexpectedly")?;
    Ok(())
}

/// One static shared secret; no per-identity scoping. Every caller holding
/// the secret may ping on behalf of any identity string.
fn authorize(state: &ApiState, headers: &HeaderMap) -> std::result::Result<(), Response> {
    let observed = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();
    if observed.is_empty() || observed != state.api_key {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({"error": "invalid api key"})),
        )
            .into_response());
    }
    Ok(())
}

async fn handle_ping(
    State(state): State<Arc<ApiState>>,
    Path(identity): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    let now = Utc::now();
    state.presence.lock().record(&identity, now);
    info!(identity = %identity, "ping recorded");
    Json(json!({
        "status": "ok",
        "timestamp": now.to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
    .into_response()
}

async fn handle_check(
    State(state): State<Arc<ApiState>>,
    Path(identity): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    let active = state.presence.lock().is_reachable(&identity, Utc::now());
    Json(json!({"active": active})).into_response()
}
