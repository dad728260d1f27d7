//! Service error taxonomy

use thiserror::Error;

use apigw_core::ModelError;

use crate::context::ContextError;
use crate::storage::StorageError;

/// Errors returned by the control plane services
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Caller supplied an invalid or incomplete request
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage or other infrastructure failure
    #[error("System error: {0}")]
    System(String),

    /// The request was cancelled before completing
    #[error("Request cancelled")]
    Cancelled,

    /// The request ran past its deadline
    #[error("Request deadline exceeded")]
    DeadlineExceeded,
}

impl ServiceError {
    /// Whether this error should page someone
    pub fn is_incident(&self) -> bool {
        matches!(self, ServiceError::System(_))
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ServiceError::NotFound(what),
            StorageError::Cancelled => ServiceError::Cancelled,
            StorageError::DeadlineExceeded => ServiceError::DeadlineExceeded,
            other => ServiceError::System(other.to_string()),
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<ContextError> for ServiceError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => ServiceError::Cancelled,
            ContextError::DeadlineExceeded => ServiceError::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_classification() {
        assert_eq!(
            ServiceError::from(StorageError::NotFound("k".into())),
            ServiceError::NotFound("k".into())
        );
        assert_eq!(
            ServiceError::from(StorageError::DeadlineExceeded),
            ServiceError::DeadlineExceeded
        );
        assert!(matches!(
            ServiceError::from(StorageError::Connection("refused".into())),
            ServiceError::System(_)
        ));
    }

    #[test]
    fn test_only_system_is_incident() {
        assert!(ServiceError::System("db".into()).is_incident());
        assert!(!ServiceError::NotFound("x".into()).is_incident());
        assert!(!ServiceError::Validation("x".into()).is_incident());
        assert!(!ServiceError::Cancelled.is_incident());
        assert!(!ServiceError::DeadlineExceeded.is_incident());
    }
}
