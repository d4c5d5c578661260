//! Admin API routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use warden_core::error::WardenError;
use warden_core::types::ChatSettings;

use crate::server::{AppState, require_token};

/// Build the admin router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/chats", get(list_chats))
        .route("/api/chats/{chat_id}", get(get_chat).put(save_chat))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub(crate) fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"ok": false, "error": "unauthorized (missing or invalid admin token)"})),
    )
        .into_response()
}

fn not_found(chat_id: i64) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "ok": false,
            "error": format!("chat {chat_id} is not registered; the bot must see a message there first"),
        })),
    )
        .into_response()
}

fn internal(e: WardenError) -> Response {
    tracing::error!("admin api error: {e}");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"ok": false, "error": e.to_string()})))
        .into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"ok": true}))
}

async fn list_chats(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_all() {
        Ok(chats) => Json(json!({"ok": true, "chats": chats})).into_response(),
        Err(e) => internal(e),
    }
}

async fn get_chat(State(state): State<Arc<AppState>>, Path(chat_id): Path<i64>) -> Response {
    match state.store.get(chat_id) {
        Ok(Some(cfg)) => Json(json!({"ok": true, "chat": cfg})).into_response(),
        Ok(None) => not_found(chat_id),
        Err(e) => internal(e),
    }
}

/// Write the editable fields, then re-arm the broadcast schedule so interval
/// or enable changes take effect immediately.
async fn save_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
    Json(settings): Json<ChatSettings>,
) -> Response {
    match state.store.save(chat_id, &settings) {
        Ok(()) => {}
        Err(WardenError::ChatNotFound(_)) => return not_found(chat_id),
        Err(e) => return internal(e),
    }
    if let Err(e) = state.registry.rearm(chat_id).await {
        tracing::warn!(chat_id, "rearm after save failed: {e}");
    }
    match state.store.get(chat_id) {
        Ok(Some(cfg)) => Json(json!({"ok": true, "chat": cfg})).into_response(),
        Ok(None) => not_found(chat_id),
        Err(e) => internal(e),
    }
}
