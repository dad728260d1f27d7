//! Publish event report handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use apigw_core::{event_detail, PublishEventReport, PublishEventStatus};

use crate::api::envelope::Legacy;
use crate::api::error::{ApiError, LegacyError};
use crate::api::extract::OpenCaller;
use crate::api::handlers::AppState;

/// Body of a publish event report
#[derive(Debug, Deserialize, Serialize)]
pub struct PublishEventRequest {
    #[serde(default)]
    pub bk_gateway_name: String,
    #[serde(default)]
    pub bk_stage_name: String,
    pub publish_id: i64,
    /// Pipeline step name
    pub name: String,
    pub status: PublishEventStatus,
    /// Opaque diagnostics; any JSON value
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl From<PublishEventRequest> for PublishEventReport {
    fn from(req: PublishEventRequest) -> Self {
        PublishEventReport {
            publish_id: req.publish_id,
            gateway_name: req.bk_gateway_name,
            stage_name: req.bk_stage_name,
            step_name: req.name,
            status: req.status,
            detail: event_detail(req.detail),
        }
    }
}

/// Record one publish pipeline progress report
///
/// POST /api/v1/open/publish/events/
pub async fn report_publish_event(
    State(state): State<Arc<AppState>>,
    caller: Result<OpenCaller, ApiError>,
    body: Result<Json<PublishEventRequest>, JsonRejection>,
) -> Result<Legacy<Option<()>>, LegacyError> {
    let caller = caller?;
    let Json(request) = body.map_err(ApiError::from)?;

    debug!(
        issuer = %caller.issuer,
        app_code = ?caller.app_code,
        publish_id = request.publish_id,
        "Publish event reported"
    );

    let ctx = state.request_context();
    state.publish_events.report(&ctx, request.into()).await?;

    Ok(Legacy::new(None))
}
