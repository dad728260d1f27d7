//! API Gateway Control Plane Server
//!
//! The control plane answers three questions for a fleet of data-plane
//! gateway instances and the pipeline that publishes their configuration:
//!
//! - Is this application allowed to call this gateway, stage or resource?
//! - Which public key verifies requests signed by this gateway?
//! - How far has a configuration publish run progressed?
//!
//! ## API Endpoints
//!
//! ### Fleet Endpoints (instance id and secret headers)
//! - `GET /api/v1/micro-gateway/{instance_id}/permissions/` - Permission lookup
//! - `GET /api/v1/micro-gateway/{instance_id}/public_keys/` - Gateway public key
//!
//! ### External Endpoints (`X-Bkapi-JWT`)
//! - `GET /api/v1/open/gateways/{gateway_name}/public_key/` - Public key, legacy envelope
//! - `GET /api/v2/open/gateways/{gateway_name}/public_key/` - Public key, current envelope
//! - `POST /api/v1/open/publish/events/` - Report publish progress
//!
//! ### Health checks
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check against the store

pub mod api;
pub mod config;
pub mod context;
pub mod service;
pub mod storage;

pub use api::create_router;
pub use api::handlers::AppState;
pub use config::{ConfigError, JwtIssuerSettings, PlaneConfig};
pub use context::{CancelHandle, ContextError, RequestContext};
pub use service::{
    PermissionQuery, PermissionService, Permissions, PublicKeyService, PublishEventService,
    ServiceError,
};
pub use storage::{ControlStore, MemoryStore, PermissionGrantFilter, Seed, StorageError};
#[cfg(feature = "postgres")]
pub use storage::PostgresStore;
