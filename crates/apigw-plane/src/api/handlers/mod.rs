//! API request handlers

pub mod permissions;
pub mod public_key;
pub mod publish_event;

use std::sync::Arc;
use std::time::Duration;

use apigw_auth::{InstanceAuthenticator, InstanceBackend, JwtAuthenticator};

use crate::context::RequestContext;
use crate::service::{PermissionService, PublicKeyService, PublishEventService};
use crate::storage::ControlStore;

pub use permissions::{query_permissions, PermissionParams};
pub use public_key::{
    get_fleet_public_key, get_open_public_key_v1, get_open_public_key_v2, FleetPublicKeyParams,
    PublicKeyPayload,
};
pub use publish_event::{report_publish_event, PublishEventRequest};

/// Application state shared across handlers
pub struct AppState {
    /// Permission lookups
    pub permissions: PermissionService,
    /// Public key lookups
    pub public_keys: PublicKeyService,
    /// Publish event ingestion
    pub publish_events: PublishEventService,
    /// Fleet instance authentication
    pub instances: InstanceAuthenticator,
    /// External caller authentication
    pub jwt: JwtAuthenticator,
    /// Storage backend, for readiness checks
    pub store: Arc<dyn ControlStore>,
    /// Deadline applied to every request
    pub request_timeout: Duration,
}

impl AppState {
    /// Wire the services to one store
    pub fn new(
        store: Arc<dyn ControlStore>,
        instance_backend: Arc<dyn InstanceBackend>,
        instance_cache_ttl: Duration,
        jwt: JwtAuthenticator,
        request_timeout: Duration,
    ) -> Self {
        Self {
            permissions: PermissionService::new(store.clone()),
            public_keys: PublicKeyService::new(store.clone()),
            publish_events: PublishEventService::new(store.clone()),
            instances: InstanceAuthenticator::new(instance_backend, instance_cache_ttl),
            jwt,
            store,
            request_timeout,
        }
    }

    /// Context for one request
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }
}
