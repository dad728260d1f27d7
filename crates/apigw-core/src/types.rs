//! Common types used across the control plane

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// A grant allowing an application to call a gateway
///
/// Grants are either gateway-wide (`resource_name` is `None`) or bound to a
/// single resource. A missing `stage_name` applies the grant to every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Target gateway
    pub gateway_name: String,

    /// Calling application
    pub app_code: String,

    /// Stage discriminator (`None` = all stages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_name: Option<String>,

    /// Resource discriminator (`None` = gateway-wide)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,

    /// Expiry, unix seconds. Interpreted by the caller.
    pub expires_at: i64,
}

impl PermissionGrant {
    /// Create a gateway-wide grant valid for every stage
    pub fn gateway_wide(
        gateway_name: impl Into<String>,
        app_code: impl Into<String>,
        expires_at: i64,
    ) -> Self {
        Self {
            gateway_name: gateway_name.into(),
            app_code: app_code.into(),
            stage_name: None,
            resource_name: None,
            expires_at,
        }
    }

    /// Create a grant bound to one resource, valid for every stage
    pub fn for_resource(
        gateway_name: impl Into<String>,
        resource_name: impl Into<String>,
        app_code: impl Into<String>,
        expires_at: i64,
    ) -> Self {
        Self {
            resource_name: Some(resource_name.into()),
            ..Self::gateway_wide(gateway_name, app_code, expires_at)
        }
    }

    /// Restrict the grant to a single stage
    pub fn in_stage(mut self, stage_name: impl Into<String>) -> Self {
        self.stage_name = Some(stage_name.into());
        self
    }

    /// Whether this grant applies to the given stage
    pub fn applies_to_stage(&self, stage_name: &str) -> bool {
        self.stage_name.as_deref().map_or(true, |s| s == stage_name)
    }

    /// Composite uniqueness key: gateway, app, stage-or-`*`, resource-or-`*`
    pub fn composite_key(&self) -> (String, String, String, String) {
        (
            self.gateway_name.clone(),
            self.app_code.clone(),
            self.stage_name.clone().unwrap_or_else(|| "*".to_string()),
            self.resource_name.clone().unwrap_or_else(|| "*".to_string()),
        )
    }
}

/// Signing public key of a gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPublicKey {
    /// Gateway name (unique)
    pub gateway_name: String,

    /// Encoded key material (PEM). Opaque to the control plane.
    pub public_key: String,
}

impl GatewayPublicKey {
    /// Create a new gateway public key record
    pub fn new(gateway_name: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            gateway_name: gateway_name.into(),
            public_key: public_key.into(),
        }
    }
}

/// Identity of a data-plane fleet instance making a fleet-scoped call
///
/// Produced by instance authentication. A dedicated instance is bound to one
/// gateway; a shared instance serves all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceIdentity {
    /// Instance identifier
    pub instance_id: String,

    /// Gateway the instance is dedicated to (`None` = shared instance)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_name: Option<String>,
}

impl InstanceIdentity {
    /// Identity of a shared instance
    pub fn shared(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            gateway_name: None,
        }
    }

    /// Identity of an instance dedicated to one gateway
    pub fn dedicated(instance_id: impl Into<String>, gateway_name: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            gateway_name: Some(gateway_name.into()),
        }
    }

    /// Whether this instance may read data belonging to `gateway_name`
    pub fn may_serve(&self, gateway_name: &str) -> bool {
        self.gateway_name.as_deref().map_or(true, |g| g == gateway_name)
    }
}

/// JWT issuer that answered an externally-facing request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuerIdentity(String);

impl IssuerIdentity {
    /// Wrap a verified `iss` claim
    pub fn new(issuer: impl Into<String>) -> Result<Self> {
        let issuer = issuer.into();
        if issuer.is_empty() {
            return Err(ModelError::MissingField("iss"));
        }
        Ok(Self(issuer))
    }

    /// The issuer as it appeared in the token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IssuerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public key paired with the issuer that served it
///
/// One payload for both response envelopes of the external key lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedPublicKey {
    /// Issuer echoed back verbatim
    pub issuer: IssuerIdentity,

    /// Key material
    pub public_key: String,
}
