//! Fleet Instance Authentication
//!
//! Data-plane instances authenticate with an instance id and a shared secret.
//! Only the SHA-256 digest of the secret is stored; comparison is constant
//! time. Backend lookups are cached for a short TTL since every fleet call
//! goes through here.

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use apigw_core::InstanceIdentity;

use crate::error::{AuthError, Result};
use crate::{INSTANCE_ID_HEADER, INSTANCE_SECRET_HEADER};

/// Registered data-plane instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetInstance {
    /// Instance identifier
    pub instance_id: String,

    /// Hex SHA-256 digest of the shared secret
    pub secret_digest: String,

    /// Gateway the instance is dedicated to (`None` = shared)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_name: Option<String>,
}

impl FleetInstance {
    /// Create a shared instance record from a plaintext secret
    pub fn new(instance_id: impl Into<String>, secret: &str) -> Self {
        Self {
            instance_id: instance_id.into(),
            secret_digest: digest_secret(secret),
            gateway_name: None,
        }
    }

    /// Dedicate the instance to one gateway
    pub fn with_gateway(mut self, gateway_name: impl Into<String>) -> Self {
        self.gateway_name = Some(gateway_name.into());
        self
    }

    /// Check a presented secret against the stored digest
    pub fn verify_secret(&self, secret: &str) -> bool {
        let presented = digest_secret(secret);
        presented
            .as_bytes()
            .ct_eq(self.secret_digest.to_ascii_lowercase().as_bytes())
            .into()
    }

    /// Identity handed to the services
    pub fn identity(&self) -> InstanceIdentity {
        InstanceIdentity {
            instance_id: self.instance_id.clone(),
            gateway_name: self.gateway_name.clone(),
        }
    }
}

/// Hex SHA-256 digest of a secret
pub fn digest_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Backend trait for instance lookup
///
/// Implemented by the control plane's storage backends.
#[async_trait]
pub trait InstanceBackend: Send + Sync {
    /// Look up an instance by id
    async fn find_instance(&self, instance_id: &str) -> Result<Option<FleetInstance>>;

    /// Get a description of this backend
    fn description(&self) -> &str {
        "instance backend"
    }
}

/// Authenticates fleet instances against a backend
pub struct InstanceAuthenticator {
    backend: Arc<dyn InstanceBackend>,
    cache: Cache<String, Arc<FleetInstance>>,
}

impl InstanceAuthenticator {
    /// Create an authenticator caching lookups for `ttl`
    pub fn new(backend: Arc<dyn InstanceBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            cache: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(10_000)
                .build(),
        }
    }

    /// Verify an instance id and secret
    pub async fn authenticate(&self, instance_id: &str, secret: &str) -> Result<InstanceIdentity> {
        if instance_id.is_empty() {
            return Err(AuthError::MissingCredential(INSTANCE_ID_HEADER));
        }
        if secret.is_empty() {
            return Err(AuthError::MissingCredential(INSTANCE_SECRET_HEADER));
        }

        let instance = self.lookup(instance_id).await?;

        if !instance.verify_secret(secret) {
            warn!(instance_id = %instance_id, "Instance secret mismatch");
            return Err(AuthError::InvalidSecret(instance_id.to_string()));
        }

        Ok(instance.identity())
    }

    async fn lookup(&self, instance_id: &str) -> Result<Arc<FleetInstance>> {
        if let Some(cached) = self.cache.get(instance_id).await {
            debug!(instance_id = %instance_id, "Using cached instance");
            return Ok(cached);
        }

        debug!(
            instance_id = %instance_id,
            backend = self.backend.description(),
            "Loading instance"
        );
        let instance = self
            .backend
            .find_instance(instance_id)
            .await?
            .ok_or_else(|| AuthError::UnknownInstance(instance_id.to_string()))?;

        let instance = Arc::new(instance);
        self.cache
            .insert(instance_id.to_string(), instance.clone())
            .await;
        Ok(instance)
    }
}
