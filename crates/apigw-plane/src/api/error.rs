//! API error types and responses

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use apigw_auth::AuthError;

use crate::context::ContextError;
use crate::service::ServiceError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request timed out")]
    Timeout,
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Cancelled => "CANCELLED",
            ApiError::Timeout => "DEADLINE_EXCEEDED",
        }
    }

    /// Render in the legacy envelope instead of the current one
    pub fn legacy(self) -> LegacyError {
        LegacyError(self)
    }
}

/// Current error body: `{"error": {"code", "message"}}`
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Code and message of a current-envelope error
#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

/// An [`ApiError`] rendered in the legacy envelope
#[derive(Debug)]
pub struct LegacyError(pub ApiError);

/// Legacy error body; `code` is the HTTP status times 100
#[derive(Serialize)]
pub struct LegacyErrorResponse {
    pub result: bool,
    pub code: u32,
    pub message: String,
    pub data: Option<()>,
}

impl IntoResponse for LegacyError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let body = LegacyErrorResponse {
            result: false,
            code: u32::from(status.as_u16()) * 100,
            message: self.0.to_string(),
            data: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ApiError> for LegacyError {
    fn from(err: ApiError) -> Self {
        LegacyError(err)
    }
}

impl From<ServiceError> for LegacyError {
    fn from(err: ServiceError) -> Self {
        LegacyError(err.into())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => ApiError::BadRequest(msg),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::System(msg) => ApiError::Internal(msg),
            ServiceError::Cancelled => ApiError::Cancelled,
            ServiceError::DeadlineExceeded => ApiError::Timeout,
        }
    }
}

impl From<ContextError> for ApiError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => ApiError::Cancelled,
            ContextError::DeadlineExceeded => ApiError::Timeout,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_client_error() {
            ApiError::Unauthorized(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_mapping() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::System("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ServiceError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
            (ServiceError::DeadlineExceeded, StatusCode::GATEWAY_TIMEOUT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(
            ApiError::from(AuthError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::Backend("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_legacy_body_code() {
        let response = ApiError::NotFound("ghost".into()).legacy().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
