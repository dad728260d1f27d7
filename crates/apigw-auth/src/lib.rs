//! Request Authentication
//!
//! Turns transport credentials into the typed identities the control plane
//! services consume:
//!
//! - **Fleet instances** present an instance id and shared secret and become
//!   an [`InstanceIdentity`](apigw_core::InstanceIdentity)
//! - **External callers** present a platform-issued JWT and become an
//!   [`IssuerIdentity`](apigw_core::IssuerIdentity)
//!
//! The services never see raw credentials.

pub mod error;
pub mod instance;
pub mod jwt;

pub use error::{AuthError, Result};
pub use instance::{digest_secret, FleetInstance, InstanceAuthenticator, InstanceBackend};
pub use jwt::{IssuerConfig, JwtAuthenticator, VerifiedToken};

/// Header carrying the fleet instance id
pub const INSTANCE_ID_HEADER: &str = "X-Bk-Micro-Gateway-Instance-Id";

/// Header carrying the fleet instance secret
pub const INSTANCE_SECRET_HEADER: &str = "X-Bk-Micro-Gateway-Instance-Secret";

/// Header carrying the platform JWT on external endpoints
pub const JWT_HEADER: &str = "X-Bkapi-JWT";

/// Re-exported so configuration code can name algorithms
pub use jsonwebtoken::Algorithm;
