//! API module for the control plane server

pub mod envelope;
pub mod error;
pub mod extract;
pub mod handlers;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint; 503 while the store is unreachable
///
/// GET /ready
pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadyResponse>) {
    match state.store.ping(&state.request_context()).await {
        Ok(()) => (StatusCode::OK, Json(ReadyResponse { ready: true })),
        Err(err) => {
            warn!(error = %err, "Store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse { ready: false }),
            )
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Fleet instance endpoints
        .route(
            "/api/v1/micro-gateway/{instance_id}/permissions/",
            get(handlers::query_permissions),
        )
        .route(
            "/api/v1/micro-gateway/{instance_id}/public_keys/",
            get(handlers::get_fleet_public_key),
        )
        // External endpoints
        .route(
            "/api/v1/open/gateways/{gateway_name}/public_key/",
            get(handlers::get_open_public_key_v1),
        )
        .route(
            "/api/v2/open/gateways/{gateway_name}/public_key/",
            get(handlers::get_open_public_key_v2),
        )
        .route(
            "/api/v1/open/publish/events/",
            post(handlers::report_publish_event),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
