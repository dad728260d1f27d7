//! Response envelopes
//!
//! Two envelope generations coexist on the wire:
//!
//! - **current**: `{"data": ...}`
//! - **legacy**: `{"result": true, "code": 0, "message": "", "data": ...}`
//!
//! Handlers pick the envelope; the payload is the same value either way.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Current envelope around a successful payload
#[derive(Debug, Clone, Serialize)]
pub struct Current<T> {
    pub data: T,
}

impl<T> Current<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for Current<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Legacy envelope around a successful payload
#[derive(Debug, Clone, Serialize)]
pub struct Legacy<T> {
    pub result: bool,
    pub code: u32,
    pub message: String,
    pub data: T,
}

impl<T> Legacy<T> {
    pub fn new(data: T) -> Self {
        Self {
            result: true,
            code: 0,
            message: String::new(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Legacy<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
