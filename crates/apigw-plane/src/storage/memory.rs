//! In-memory storage backend
//!
//! Default storage implementation using in-memory maps.
//! Suitable for development and tests. Data is lost on restart; a JSON seed
//! file can pre-populate grants, keys and instances.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use apigw_auth::{AuthError, FleetInstance, InstanceBackend};
use apigw_core::{GatewayPublicKey, PermissionGrant, PublishEvent};

use super::{ControlStore, PermissionGrantFilter, StorageError};
use crate::context::RequestContext;

type GrantKey = (String, String, String, String);

/// Initial contents for a [`MemoryStore`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub instances: Vec<FleetInstance>,
    #[serde(default)]
    pub grants: Vec<PermissionGrant>,
    #[serde(default)]
    pub public_keys: Vec<GatewayPublicKey>,
}

impl Seed {
    /// Load a seed from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Internal(format!("cannot read seed {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::Serialization(format!("invalid seed {}: {}", path.display(), e))
        })
    }
}

/// In-memory control store implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    grants: RwLock<HashMap<GrantKey, PermissionGrant>>,
    public_keys: RwLock<HashMap<String, GatewayPublicKey>>,
    events: RwLock<Vec<PublishEvent>>,
    instances: RwLock<HashMap<String, FleetInstance>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StorageError> {
    lock.read()
        .map_err(|_| StorageError::Internal("memory store lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StorageError> {
    lock.write()
        .map_err(|_| StorageError::Internal("memory store lock poisoned".into()))
}

impl MemoryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated from a seed
    pub fn from_seed(seed: Seed) -> Result<Self, StorageError> {
        let store = Self::new();
        for instance in seed.instances {
            store.register_instance(instance)?;
        }
        for grant in seed.grants {
            store.put_grant(grant)?;
        }
        for key in seed.public_keys {
            store.put_public_key(key)?;
        }
        Ok(store)
    }

    // =========================================================================
    // Administration (normally done by external tooling)
    // =========================================================================

    /// Insert or replace a grant, keyed by its composite key
    pub fn put_grant(&self, grant: PermissionGrant) -> Result<(), StorageError> {
        let mut grants = write(&self.grants)?;
        info!(
            gateway = %grant.gateway_name,
            app_code = %grant.app_code,
            stage = ?grant.stage_name,
            resource = ?grant.resource_name,
            expires_at = grant.expires_at,
            "Storing permission grant"
        );
        grants.insert(grant.composite_key(), grant);
        Ok(())
    }

    /// Insert or replace the public key of a gateway
    pub fn put_public_key(&self, key: GatewayPublicKey) -> Result<(), StorageError> {
        let mut keys = write(&self.public_keys)?;
        info!(gateway = %key.gateway_name, "Storing gateway public key");
        keys.insert(key.gateway_name.clone(), key);
        Ok(())
    }

    /// Register or replace a fleet instance
    pub fn register_instance(&self, instance: FleetInstance) -> Result<(), StorageError> {
        let mut instances = write(&self.instances)?;
        info!(
            instance_id = %instance.instance_id,
            gateway = ?instance.gateway_name,
            "Registering fleet instance"
        );
        instances.insert(instance.instance_id.clone(), instance);
        Ok(())
    }

    // =========================================================================
    // Ledger inspection
    // =========================================================================

    /// Every ledger record, in arrival order
    pub fn publish_events(&self) -> Result<Vec<PublishEvent>, StorageError> {
        Ok(read(&self.events)?.clone())
    }

    /// Ledger records of one publish run, in arrival order
    pub fn publish_events_for(&self, publish_id: i64) -> Result<Vec<PublishEvent>, StorageError> {
        Ok(read(&self.events)?
            .iter()
            .filter(|e| e.publish_id == publish_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ControlStore for MemoryStore {
    async fn find_permission_grants(
        &self,
        ctx: &RequestContext,
        filter: &PermissionGrantFilter,
    ) -> Result<Vec<PermissionGrant>, StorageError> {
        ctx.check()?;
        let grants = read(&self.grants)?;
        Ok(grants
            .values()
            .filter(|g| g.gateway_name == filter.gateway_name && g.app_code == filter.app_code)
            .cloned()
            .collect())
    }

    async fn find_public_key(
        &self,
        ctx: &RequestContext,
        gateway_name: &str,
    ) -> Result<GatewayPublicKey, StorageError> {
        ctx.check()?;
        let keys = read(&self.public_keys)?;
        keys.get(gateway_name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("public key of gateway {}", gateway_name)))
    }

    async fn insert_publish_event(
        &self,
        ctx: &RequestContext,
        event: &PublishEvent,
    ) -> Result<(), StorageError> {
        ctx.check()?;
        let mut events = write(&self.events)?;
        events.push(event.clone());
        Ok(())
    }

    async fn ping(&self, ctx: &RequestContext) -> Result<(), StorageError> {
        ctx.check()?;
        Ok(())
    }
}

#[async_trait]
impl InstanceBackend for MemoryStore {
    async fn find_instance(&self, instance_id: &str) -> apigw_auth::Result<Option<FleetInstance>> {
        let instances = read(&self.instances).map_err(|e| AuthError::Backend(e.to_string()))?;
        Ok(instances.get(instance_id).cloned())
    }

    fn description(&self) -> &str {
        "memory store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apigw_core::{EventDetail, PublishEventStatus};
    use chrono::Utc;

    fn event(publish_id: i64, step: &str, status: PublishEventStatus) -> PublishEvent {
        PublishEvent {
            publish_id,
            gateway_name: "benchmark".into(),
            stage_name: "dev".into(),
            step_name: step.into(),
            status,
            detail: EventDetail::new(),
            reported_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_grants_filtered_by_pair() {
        let store = MemoryStore::new();
        store
            .put_grant(PermissionGrant::gateway_wide("benchmark", "app-a", 10))
            .unwrap();
        store
            .put_grant(PermissionGrant::gateway_wide("benchmark", "app-b", 20))
            .unwrap();
        store
            .put_grant(PermissionGrant::gateway_wide("other", "app-a", 30))
            .unwrap();

        let ctx = RequestContext::background();
        let grants = store
            .find_permission_grants(&ctx, &PermissionGrantFilter::new("benchmark", "app-a"))
            .await
            .unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].expires_at, 10);
    }

    #[tokio::test]
    async fn test_grant_composite_key_replaces() {
        let store = MemoryStore::new();
        store
            .put_grant(PermissionGrant::gateway_wide("benchmark", "app", 10).in_stage("dev"))
            .unwrap();
        store
            .put_grant(PermissionGrant::gateway_wide("benchmark", "app", 99).in_stage("dev"))
            .unwrap();
        store
            .put_grant(PermissionGrant::gateway_wide("benchmark", "app", 50))
            .unwrap();

        let ctx = RequestContext::background();
        let mut grants = store
            .find_permission_grants(&ctx, &PermissionGrantFilter::new("benchmark", "app"))
            .await
            .unwrap();
        grants.sort_by_key(|g| g.expires_at);
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].expires_at, 50);
        assert_eq!(grants[1].expires_at, 99);
    }

    #[tokio::test]
    async fn test_missing_public_key_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .find_public_key(&RequestContext::background(), "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ledger_appends_duplicates() {
        let store = MemoryStore::new();
        let ctx = RequestContext::background();
        let e = event(42, "parse_configuration", PublishEventStatus::Doing);

        store.insert_publish_event(&ctx, &e).await.unwrap();
        store.insert_publish_event(&ctx, &e).await.unwrap();
        store
            .insert_publish_event(&ctx, &event(7, "load_configuration", PublishEventStatus::Success))
            .await
            .unwrap();

        assert_eq!(store.publish_events().unwrap().len(), 3);
        assert_eq!(store.publish_events_for(42).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_context_rejected() {
        let store = MemoryStore::new();
        let (ctx, handle) = RequestContext::cancellable();
        handle.cancel();

        let err = store.ping(&ctx).await.unwrap_err();
        assert!(matches!(err, StorageError::Cancelled));

        let err = store
            .insert_publish_event(&ctx, &event(1, "x", PublishEventStatus::Pending))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Cancelled));
        assert!(store.publish_events().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_populates_store() {
        let seed: Seed = serde_json::from_value(serde_json::json!({
            "instances": [{"instance_id": "i-1", "secret_digest": "00", "gateway_name": "benchmark"}],
            "grants": [{"gateway_name": "benchmark", "app_code": "demo", "expires_at": 5}],
            "public_keys": [{"gateway_name": "benchmark", "public_key": "PEM"}]
        }))
        .unwrap();

        let store = MemoryStore::from_seed(seed).unwrap();
        let ctx = RequestContext::background();

        let key = store.find_public_key(&ctx, "benchmark").await.unwrap();
        assert_eq!(key.public_key, "PEM");

        let instance = store.find_instance("i-1").await.unwrap().unwrap();
        assert_eq!(instance.gateway_name.as_deref(), Some("benchmark"));
    }
}
