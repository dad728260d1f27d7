//! Gateway public key handlers
//!
//! Fleet instances fetch keys on the micro-gateway path. External callers
//! fetch them on the open path, in either envelope, with their JWT issuer
//! echoed back.

use axum::extract::{rejection::QueryRejection, Path, Query, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use apigw_core::IssuedPublicKey;

use crate::api::envelope::{Current, Legacy};
use crate::api::error::{ApiError, LegacyError};
use crate::api::extract::{FleetCaller, OpenCaller};
use crate::api::handlers::AppState;

/// Query string of a fleet key lookup
#[derive(Debug, Default, Deserialize)]
pub struct FleetPublicKeyParams {
    #[serde(default)]
    pub bk_gateway_name: String,
}

/// Key material returned to fleet instances
#[derive(Debug, Serialize)]
pub struct PublicKeyPayload {
    pub public_key: String,
}

/// Public key of a gateway, for a fleet instance
///
/// GET /api/v1/micro-gateway/{instance_id}/public_keys/
pub async fn get_fleet_public_key(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    caller: FleetCaller,
    params: Result<Query<FleetPublicKeyParams>, QueryRejection>,
) -> Result<Current<PublicKeyPayload>, ApiError> {
    let instance = caller.for_path(&instance_id)?;
    let Query(params) = params?;

    let ctx = state.request_context();
    let public_key = state
        .public_keys
        .get(&ctx, &instance, &params.bk_gateway_name)
        .await?;

    Ok(Current::new(PublicKeyPayload { public_key }))
}

async fn issued_key(
    state: &AppState,
    caller: OpenCaller,
    gateway_name: &str,
) -> Result<IssuedPublicKey, ApiError> {
    let ctx = state.request_context();
    Ok(state
        .public_keys
        .get_for_issuer(&ctx, &caller.issuer, gateway_name)
        .await?)
}

/// Public key of a gateway in the legacy envelope
///
/// GET /api/v1/open/gateways/{gateway_name}/public_key/
pub async fn get_open_public_key_v1(
    State(state): State<Arc<AppState>>,
    Path(gateway_name): Path<String>,
    caller: Result<OpenCaller, ApiError>,
) -> Result<Legacy<IssuedPublicKey>, LegacyError> {
    let issued = issued_key(&state, caller?, &gateway_name).await?;
    Ok(Legacy::new(issued))
}

/// Public key of a gateway in the current envelope
///
/// GET /api/v2/open/gateways/{gateway_name}/public_key/
pub async fn get_open_public_key_v2(
    State(state): State<Arc<AppState>>,
    Path(gateway_name): Path<String>,
    caller: OpenCaller,
) -> Result<Current<IssuedPublicKey>, ApiError> {
    let issued = issued_key(&state, caller, &gateway_name).await?;
    Ok(Current::new(issued))
}
