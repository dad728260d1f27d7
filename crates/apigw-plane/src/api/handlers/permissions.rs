//! Permission lookup handler for fleet instances

use axum::extract::{rejection::QueryRejection, Path, Query, State};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::envelope::Current;
use crate::api::error::ApiError;
use crate::api::extract::FleetCaller;
use crate::api::handlers::AppState;
use crate::service::{PermissionQuery, Permissions};

/// Query string of a permission lookup
#[derive(Debug, Default, Deserialize)]
pub struct PermissionParams {
    #[serde(default)]
    pub bk_gateway_name: String,
    #[serde(default)]
    pub bk_stage_name: String,
    #[serde(default)]
    pub bk_resource_name: String,
    #[serde(default)]
    pub bk_app_code: String,
}

impl From<PermissionParams> for PermissionQuery {
    fn from(params: PermissionParams) -> Self {
        PermissionQuery::new(params.bk_gateway_name, params.bk_stage_name, params.bk_app_code)
            .with_resource(params.bk_resource_name)
    }
}

/// Look up an application's permissions on a gateway stage
///
/// GET /api/v1/micro-gateway/{instance_id}/permissions/
pub async fn query_permissions(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    caller: FleetCaller,
    params: Result<Query<PermissionParams>, QueryRejection>,
) -> Result<Current<Permissions>, ApiError> {
    let instance = caller.for_path(&instance_id)?;
    let Query(params) = params?;

    let ctx = state.request_context();
    let permissions = state
        .permissions
        .query(&ctx, &instance, &params.into())
        .await?;

    Ok(Current::new(permissions))
}
