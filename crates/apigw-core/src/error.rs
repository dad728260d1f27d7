//! Error types for the control plane data model

use thiserror::Error;

/// Result type alias using ModelError
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while building or parsing model values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A required field was empty or missing
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}
