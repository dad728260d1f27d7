//! Storage abstraction for the control plane
//!
//! This module provides a trait-based abstraction over the three accessors the
//! services consume (permission grants, gateway public keys, publish event
//! ledger), with an in-memory (default) and a PostgreSQL backend.
//!
//! Grants, keys and instances are written by external administration tooling;
//! from the control plane's point of view they are read-only. The publish
//! event ledger is append-only.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{MemoryStore, Seed};
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use apigw_core::{GatewayPublicKey, PermissionGrant, PublishEvent};
use async_trait::async_trait;
use std::fmt::Debug;

use crate::context::{ContextError, RequestContext};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal storage error: {0}")]
    Internal(String),

    #[error("Storage operation cancelled")]
    Cancelled,

    #[error("Storage operation exceeded the request deadline")]
    DeadlineExceeded,
}

impl From<ContextError> for StorageError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => StorageError::Cancelled,
            ContextError::DeadlineExceeded => StorageError::DeadlineExceeded,
        }
    }
}

/// Filter for permission grant lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrantFilter {
    /// Target gateway
    pub gateway_name: String,
    /// Calling application
    pub app_code: String,
}

impl PermissionGrantFilter {
    /// Filter for one (gateway, app) pair
    pub fn new(gateway_name: impl Into<String>, app_code: impl Into<String>) -> Self {
        Self {
            gateway_name: gateway_name.into(),
            app_code: app_code.into(),
        }
    }
}

/// Storage backend trait for control plane state
///
/// Implementations must be thread-safe and must abandon work once `ctx` is
/// cancelled or past its deadline.
#[async_trait]
pub trait ControlStore: Send + Sync + Debug {
    // =========================================================================
    // Permission Grants
    // =========================================================================

    /// All grants of one (gateway, app) pair, any stage, any resource.
    /// An empty vector means nothing was ever granted.
    async fn find_permission_grants(
        &self,
        ctx: &RequestContext,
        filter: &PermissionGrantFilter,
    ) -> Result<Vec<PermissionGrant>, StorageError>;

    // =========================================================================
    // Gateway Public Keys
    // =========================================================================

    /// The active public key of a gateway, or `StorageError::NotFound`
    async fn find_public_key(
        &self,
        ctx: &RequestContext,
        gateway_name: &str,
    ) -> Result<GatewayPublicKey, StorageError>;

    // =========================================================================
    // Publish Event Ledger
    // =========================================================================

    /// Append one record. Never updates or merges existing records.
    async fn insert_publish_event(
        &self,
        ctx: &RequestContext,
        event: &PublishEvent,
    ) -> Result<(), StorageError>;

    // =========================================================================
    // Health
    // =========================================================================

    /// Check that the backend is reachable
    async fn ping(&self, ctx: &RequestContext) -> Result<(), StorageError>;
}
