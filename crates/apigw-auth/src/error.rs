//! Error types for request authentication

use thiserror::Error;

/// Result type for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while authenticating a caller
#[derive(Error, Debug)]
pub enum AuthError {
    /// Required credential header absent
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// Instance id not registered
    #[error("Unknown instance: {0}")]
    UnknownInstance(String),

    /// Instance secret does not match
    #[error("Invalid secret for instance {0}")]
    InvalidSecret(String),

    /// Instance id in the path differs from the authenticated one
    #[error("Instance mismatch: authenticated as {authenticated}, requested {requested}")]
    InstanceMismatch {
        authenticated: String,
        requested: String,
    },

    /// Invalid token format
    #[error("Invalid token format: {0}")]
    InvalidFormat(String),

    /// Token issuer is not trusted
    #[error("Unknown issuer: {0}")]
    UnknownIssuer(String),

    /// Missing required claim
    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    /// Token has expired
    #[error("Token expired")]
    Expired,

    /// Signature does not verify
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Issuer key cannot be loaded
    #[error("Invalid issuer key: {0}")]
    InvalidKey(String),

    /// Instance backend failed
    #[error("Backend error: {0}")]
    Backend(String),
}

impl AuthError {
    /// Whether the failure is the caller's fault rather than ours
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuthError::Backend(_) | AuthError::InvalidKey(_))
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature(err.to_string()),
            ErrorKind::InvalidIssuer => AuthError::UnknownIssuer(err.to_string()),
            ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
            ErrorKind::InvalidKeyFormat => AuthError::InvalidKey(err.to_string()),
            _ => AuthError::InvalidFormat(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::InvalidFormat(err.to_string())
    }
}
