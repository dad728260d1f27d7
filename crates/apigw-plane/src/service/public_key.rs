//! Gateway public key distribution

use std::sync::Arc;
use tracing::debug;

use apigw_core::{InstanceIdentity, IssuedPublicKey, IssuerIdentity, ModelError};

use super::{log_failure, ServiceError};
use crate::context::RequestContext;
use crate::storage::ControlStore;

/// Resolves a gateway name to its active public key
#[derive(Debug, Clone)]
pub struct PublicKeyService {
    store: Arc<dyn ControlStore>,
}

impl PublicKeyService {
    pub fn new(store: Arc<dyn ControlStore>) -> Self {
        Self { store }
    }

    /// The key material of `gateway_name`, byte-for-byte as stored
    pub async fn get_by_gateway_name(
        &self,
        ctx: &RequestContext,
        gateway_name: &str,
    ) -> Result<String, ServiceError> {
        let result = self.lookup(ctx, gateway_name).await;
        if let Err(err) = &result {
            log_failure("get_public_key", err);
        }
        result
    }

    /// Key lookup for a fleet instance; instances bound to another gateway
    /// get `NotFound`
    pub async fn get(
        &self,
        ctx: &RequestContext,
        instance: &InstanceIdentity,
        gateway_name: &str,
    ) -> Result<String, ServiceError> {
        if !gateway_name.is_empty() && !instance.may_serve(gateway_name) {
            let err = ServiceError::NotFound(format!(
                "gateway {} is not served by instance {}",
                gateway_name, instance.instance_id
            ));
            log_failure("get_public_key", &err);
            return Err(err);
        }
        self.get_by_gateway_name(ctx, gateway_name).await
    }

    /// Key lookup on the external path, paired with the caller's issuer
    pub async fn get_for_issuer(
        &self,
        ctx: &RequestContext,
        issuer: &IssuerIdentity,
        gateway_name: &str,
    ) -> Result<IssuedPublicKey, ServiceError> {
        let public_key = self.get_by_gateway_name(ctx, gateway_name).await?;
        Ok(IssuedPublicKey {
            issuer: issuer.clone(),
            public_key,
        })
    }

    async fn lookup(&self, ctx: &RequestContext, gateway_name: &str) -> Result<String, ServiceError> {
        if gateway_name.is_empty() {
            return Err(ModelError::MissingField("gateway_name").into());
        }

        let key = self.store.find_public_key(ctx, gateway_name).await?;
        debug!(gateway = %gateway_name, "Resolved gateway public key");
        Ok(key.public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use apigw_core::GatewayPublicKey;

    const PEM: &str = "-----BEGIN PUBLIC KEY-----\nMCowBQYDK2VwAyEA\n-----END PUBLIC KEY-----\n";

    fn service() -> PublicKeyService {
        let store = MemoryStore::new();
        store
            .put_public_key(GatewayPublicKey::new("benchmark", PEM))
            .unwrap();
        PublicKeyService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_exact_key_material() {
        let key = service()
            .get_by_gateway_name(&RequestContext::background(), "benchmark")
            .await
            .unwrap();
        assert_eq!(key, PEM);
    }

    #[tokio::test]
    async fn test_unknown_gateway_not_found() {
        let err = service()
            .get_by_gateway_name(&RequestContext::background(), "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_gateway_is_validation() {
        let err = service()
            .get_by_gateway_name(&RequestContext::background(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_instance_scope() {
        let svc = service();
        let ctx = RequestContext::background();

        let own = InstanceIdentity::dedicated("i-1", "benchmark");
        assert_eq!(svc.get(&ctx, &own, "benchmark").await.unwrap(), PEM);

        let foreign = InstanceIdentity::dedicated("i-2", "other");
        let err = svc.get(&ctx, &foreign, "benchmark").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_issuer_is_echoed() {
        let issuer = IssuerIdentity::new("bk-apigateway").unwrap();
        let issued = service()
            .get_for_issuer(&RequestContext::background(), &issuer, "benchmark")
            .await
            .unwrap();
        assert_eq!(issued.issuer.as_str(), "bk-apigateway");
        assert_eq!(issued.public_key, PEM);
    }
}
