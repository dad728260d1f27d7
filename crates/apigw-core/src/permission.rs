//! Permission keys
//!
//! A permission query answers with a map keyed by permission class:
//!
//! - gateway-wide: `"{gateway}:-:{app_code}"`
//! - resource-specific: `"{gateway}:{resource}:{app_code}"`
//!
//! Data-plane instances look these keys up verbatim, so the format is part
//! of the wire contract.

use std::fmt;

/// Placeholder used in the resource slot of a gateway-wide key
pub const GATEWAY_WIDE_MARKER: &str = "-";

/// A permission class for one (gateway, app) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PermissionKey {
    /// Covers every resource of the gateway
    Gateway { gateway: String, app_code: String },

    /// Covers one resource
    Resource {
        gateway: String,
        resource: String,
        app_code: String,
    },
}

impl PermissionKey {
    /// Gateway-wide key
    pub fn gateway(gateway: impl Into<String>, app_code: impl Into<String>) -> Self {
        Self::Gateway {
            gateway: gateway.into(),
            app_code: app_code.into(),
        }
    }

    /// Resource-specific key
    pub fn resource(
        gateway: impl Into<String>,
        resource: impl Into<String>,
        app_code: impl Into<String>,
    ) -> Self {
        Self::Resource {
            gateway: gateway.into(),
            resource: resource.into(),
            app_code: app_code.into(),
        }
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKey::Gateway { gateway, app_code } => {
                write!(f, "{}:{}:{}", gateway, GATEWAY_WIDE_MARKER, app_code)
            }
            PermissionKey::Resource {
                gateway,
                resource,
                app_code,
            } => write!(f, "{}:{}:{}", gateway, resource, app_code),
        }
    }
}
