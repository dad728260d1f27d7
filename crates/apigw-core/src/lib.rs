//! # API Gateway Control Plane Core
//!
//! Data model shared by the control plane crates.
//!
//! ## Key Concepts
//!
//! - **Permission grant**: an application's right to call a gateway, either
//!   gateway-wide or for one resource, optionally limited to one stage
//! - **Permission key**: the string a data-plane instance looks a grant up by
//! - **Gateway public key**: the key used to verify requests signed by a gateway
//! - **Publish event**: one progress report of a configuration publish run
//! - **Step rank**: ordinal of a pipeline step, 0 for unknown steps

pub mod error;
pub mod permission;
pub mod publish;
pub mod step;
pub mod types;

pub use error::{ModelError, Result};
pub use permission::PermissionKey;
pub use publish::{
    event_detail, EventDetail, PublishEvent, PublishEventReport, PublishEventStatus,
    DETAIL_VALUE_KEY,
};
pub use step::{step_rank, PublishStep, UNRANKED};
pub use types::{
    GatewayPublicKey, InstanceIdentity, IssuedPublicKey, IssuerIdentity, PermissionGrant,
};
