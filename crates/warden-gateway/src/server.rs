//! HTTP server setup and the admin-token gate.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use warden_core::error::Result;
use warden_scheduler::ScheduleRegistry;
use warden_store::Store;

/// Shared state for the admin gateway.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub registry: ScheduleRegistry,
    pub admin_token: String,
}

/// Admin token middleware: validates the X-Admin-Token header or `?token=`
/// query. `/health` stays open.
pub(crate) async fn require_token(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    let from_header = req
        .headers()
        .get("X-Admin-Token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if from_header == state.admin_token {
        return next.run(req).await;
    }

    if let Some(query) = req.uri().query() {
        for pair in query.split('&') {
            if let Some(token) = pair.strip_prefix("token=") {
                if token == state.admin_token {
                    return next.run(req).await;
                }
            }
        }
    }

    crate::routes::unauthorized()
}

/// Bind and serve the admin API on the given port.
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let app = crate::routes::router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("admin panel listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
