//! Control plane services
//!
//! Stateless services over a shared [`ControlStore`](crate::storage::ControlStore):
//!
//! - [`PermissionService`]: composes gateway-wide and resource grants
//! - [`PublicKeyService`]: resolves a gateway to its signing public key
//! - [`PublishEventService`]: appends publish pipeline progress reports
//!
//! Storage errors are classified once, here, into [`ServiceError`].

pub mod error;
pub mod permission;
pub mod public_key;
pub mod publish_event;

pub use error::ServiceError;
pub use permission::{PermissionQuery, PermissionService, Permissions};
pub use public_key::PublicKeyService;
pub use publish_event::PublishEventService;

use tracing::{debug, error};

/// Log a failed service call at the level its class deserves
pub(crate) fn log_failure(operation: &'static str, err: &ServiceError) {
    if err.is_incident() {
        error!(operation, error = %err, "Service call failed");
    } else {
        debug!(operation, error = %err, "Service call rejected");
    }
}
