//! API handlers for magnet URI access and service state.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use seedcast_core::StateError;
use seedcast_core::state::{KEY_MAGNET_URI, KEY_VIEWS};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::server::AppState;

#[derive(Deserialize)]
pub struct AccessMagnetUriQuery {
    #[serde(default = "default_add_view")]
    pub add_view: bool,
}

fn default_add_view() -> bool {
    true
}

/// `GET /accessMagnetURI` - returns the stored magnet URI and optionally
/// increments the view counter.
pub async fn access_magnet_uri(
    State(state): State<AppState>,
    Query(query): Query<AccessMagnetUriQuery>,
) -> Result<Json<Value>, StatusCode> {
    if query.add_view {
        state.state.atomic_add(KEY_VIEWS, 1).map_err(internal)?;
    }
    let views = state.state.get_i64(KEY_VIEWS, 0).map_err(internal)?;
    let magnet_uri = state
        .state
        .get(KEY_MAGNET_URI)
        .map_err(internal)?
        .unwrap_or(Value::Null);

    Ok(Json(json!({
        "views": views,
        "magnetURI": magnet_uri,
        "add_view": query.add_view,
    })))
}

/// `GET /info` - diagnostic report: version, uptime anchors, process
/// identity, and a full state snapshot.
pub async fn info(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let snapshot = state.state.snapshot().map_err(internal)?;
    let views = snapshot.get(KEY_VIEWS).and_then(Value::as_i64).unwrap_or(0);

    Ok(Json(json!({
        "version": state.version,
        "launched_at": state.started_at.to_rfc3339(),
        "current_utc_time": Utc::now().to_rfc3339(),
        "process_id": std::process::id(),
        "thread_id": format!("{:?}", std::thread::current().id()),
        "views": views,
        "app_state": snapshot,
    })))
}

/// `GET /stats` - the view counter, stringified.
pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let views = state.state.get_i64(KEY_VIEWS, 0).map_err(internal)?;
    Ok(Json(json!({ "views": views.to_string() })))
}

/// `GET /clear` - drops all persisted state and touches the restart sentinel
/// so the supervising process restarts the service.
pub async fn clear(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    state.state.clear().map_err(internal)?;

    // Truncate-write so the mtime moves even when the sentinel already
    // exists; the supervisor watches the modification time.
    let sentinel = &state.config.storage.restart_file;
    if let Err(e) = tokio::fs::write(sentinel, []).await {
        error!(sentinel = %sentinel.display(), "failed to touch restart sentinel: {e}");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok("Server queued for restart.")
}

fn internal(e: StateError) -> StatusCode {
    error!("state store operation failed: {e}");
    StatusCode::INTERNAL_SERVER_ERROR
}
