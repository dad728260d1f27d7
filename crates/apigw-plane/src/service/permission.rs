//! Permission lookup
//!
//! A data-plane instance asks whether an application may call a gateway
//! stage, optionally for one resource. The answer maps each matched
//! permission key to the expiry of the grant behind it:
//!
//! - `"{gateway}:-:{app_code}"` when a gateway-wide grant applies
//! - `"{gateway}:{resource}:{app_code}"` when a grant for the resource applies
//!
//! The two keys are independent. Expiry is reported, not enforced.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use apigw_core::{InstanceIdentity, ModelError, PermissionKey};

use super::{log_failure, ServiceError};
use crate::context::RequestContext;
use crate::storage::{ControlStore, PermissionGrantFilter};

/// Matched permission keys and their `expires_at` (unix seconds)
pub type Permissions = HashMap<String, i64>;

/// Coordinates of a permission lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionQuery {
    /// Target gateway
    pub gateway_name: String,
    /// Target stage
    pub stage_name: String,
    /// Target resource; empty when only the gateway-wide key is wanted
    pub resource_name: Option<String>,
    /// Calling application
    pub app_code: String,
}

impl PermissionQuery {
    /// Query for the gateway-wide key only
    pub fn new(
        gateway_name: impl Into<String>,
        stage_name: impl Into<String>,
        app_code: impl Into<String>,
    ) -> Self {
        Self {
            gateway_name: gateway_name.into(),
            stage_name: stage_name.into(),
            resource_name: None,
            app_code: app_code.into(),
        }
    }

    /// Also look up the key of one resource
    pub fn with_resource(mut self, resource_name: impl Into<String>) -> Self {
        let resource_name = resource_name.into();
        self.resource_name = (!resource_name.is_empty()).then_some(resource_name);
        self
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.gateway_name.is_empty() {
            return Err(ModelError::MissingField("gateway_name"));
        }
        if self.stage_name.is_empty() {
            return Err(ModelError::MissingField("stage_name"));
        }
        if self.app_code.is_empty() {
            return Err(ModelError::MissingField("app_code"));
        }
        Ok(())
    }

    fn resource(&self) -> Option<&str> {
        self.resource_name.as_deref().filter(|r| !r.is_empty())
    }
}

/// Answers permission lookups from stored grants
#[derive(Debug, Clone)]
pub struct PermissionService {
    store: Arc<dyn ControlStore>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn ControlStore>) -> Self {
        Self { store }
    }

    /// Look up the permissions of `query.app_code` on the target gateway
    ///
    /// Returns `NotFound` when the application holds no grant at all on the
    /// gateway, or when `instance` is bound to another gateway. Grants that
    /// exist but match neither key produce an empty map.
    pub async fn query(
        &self,
        ctx: &RequestContext,
        instance: &InstanceIdentity,
        query: &PermissionQuery,
    ) -> Result<Permissions, ServiceError> {
        let result = self.lookup(ctx, instance, query).await;
        if let Err(err) = &result {
            log_failure("query_permissions", err);
        }
        result
    }

    async fn lookup(
        &self,
        ctx: &RequestContext,
        instance: &InstanceIdentity,
        query: &PermissionQuery,
    ) -> Result<Permissions, ServiceError> {
        query.validate()?;

        if !instance.may_serve(&query.gateway_name) {
            return Err(ServiceError::NotFound(format!(
                "gateway {} is not served by instance {}",
                query.gateway_name, instance.instance_id
            )));
        }

        let filter = PermissionGrantFilter::new(&query.gateway_name, &query.app_code);
        let grants = self.store.find_permission_grants(ctx, &filter).await?;

        if grants.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "no permission of app {} on gateway {}",
                query.app_code, query.gateway_name
            )));
        }

        let resource = query.resource();
        let mut permissions = Permissions::new();

        for grant in grants
            .iter()
            .filter(|g| g.applies_to_stage(&query.stage_name))
        {
            let key = match grant.resource_name.as_deref() {
                None => PermissionKey::gateway(&query.gateway_name, &query.app_code),
                Some(granted) if Some(granted) == resource => {
                    PermissionKey::resource(&query.gateway_name, granted, &query.app_code)
                }
                Some(_) => continue,
            };

            permissions
                .entry(key.to_string())
                .and_modify(|expires_at| *expires_at = (*expires_at).max(grant.expires_at))
                .or_insert(grant.expires_at);
        }

        debug!(
            gateway = %query.gateway_name,
            stage = %query.stage_name,
            app_code = %query.app_code,
            matched = permissions.len(),
            "Resolved permissions"
        );

        Ok(permissions)
    }
}
