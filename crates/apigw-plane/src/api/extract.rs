//! Caller identity extractors
//!
//! Credentials are checked here, before a handler runs. Handlers receive
//! typed identities only.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use tracing::warn;

use apigw_auth::{AuthError, INSTANCE_ID_HEADER, INSTANCE_SECRET_HEADER, JWT_HEADER};
use apigw_core::{InstanceIdentity, IssuerIdentity};

use super::error::ApiError;
use super::handlers::AppState;

fn header<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, AuthError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingCredential(name))
}

fn reject(err: AuthError) -> ApiError {
    if err.is_client_error() {
        warn!(error = %err, "Rejected caller credentials");
    }
    ApiError::from(err)
}

/// A fleet instance authenticated by id and secret headers
#[derive(Debug, Clone)]
pub struct FleetCaller(pub InstanceIdentity);

impl FleetCaller {
    /// The identity, provided it matches the `{instance_id}` path segment
    pub fn for_path(self, instance_id: &str) -> Result<InstanceIdentity, ApiError> {
        if self.0.instance_id != instance_id {
            return Err(reject(AuthError::InstanceMismatch {
                authenticated: self.0.instance_id,
                requested: instance_id.to_string(),
            }));
        }
        Ok(self.0)
    }
}

impl FromRequestParts<Arc<AppState>> for FleetCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let instance_id = header(parts, INSTANCE_ID_HEADER).map_err(reject)?;
        let secret = header(parts, INSTANCE_SECRET_HEADER).map_err(reject)?;

        // Backend lookups share the request deadline
        let identity = state
            .request_context()
            .run(async {
                state
                    .instances
                    .authenticate(instance_id, secret)
                    .await
                    .map_err(reject)
            })
            .await?;

        Ok(FleetCaller(identity))
    }
}

/// An external caller authenticated by a platform JWT
#[derive(Debug, Clone)]
pub struct OpenCaller {
    /// Issuer of the token
    pub issuer: IssuerIdentity,
    /// Calling application, when the token names one
    pub app_code: Option<String>,
}

impl FromRequestParts<Arc<AppState>> for OpenCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = header(parts, JWT_HEADER).map_err(reject)?;
        let verified = state.jwt.verify(token).map_err(reject)?;

        Ok(OpenCaller {
            issuer: verified.issuer,
            app_code: verified.app_code,
        })
    }
}
