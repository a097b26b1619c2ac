// =============================================================================
// HTTP Surface — Axum 0.7
// =============================================================================
//
// JSON endpoints live under `/api/v1/`. The WebSocket push channel is mounted
// at `/ws`. Every other path falls through to the static client assets.
//
// CORS is permissive; there is no authentication.
// =============================================================================

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::app_state::AppState;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with CORS middleware, static assets and shared state.
pub fn router(state: Arc<AppState>, static_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/alerts", get(pending_alerts))
        .route("/ws", get(crate::api::ws::ws_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

/// Public view of a pending alert. Recipients are never exposed.
#[derive(Serialize)]
struct PendingAlertView {
    symbol: String,
    target: String,
}

async fn pending_alerts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let alerts: Vec<PendingAlertView> = state
        .pending_alerts()
        .into_iter()
        .map(|a| PendingAlertView {
            symbol: a.symbol,
            target: a.target_text,
        })
        .collect();
    Json(alerts)
}
