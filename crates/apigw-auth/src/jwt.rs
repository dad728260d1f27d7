//! JWT Issuer Authentication
//!
//! Externally-facing endpoints receive a JWT in the `X-Bkapi-JWT` header. The
//! token's `iss` claim selects one of the configured issuers, whose PEM key
//! then verifies the signature, expiry and issuer. The verified issuer is
//! handed to the services so responses can echo which trust domain answered.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use apigw_core::IssuerIdentity;

use crate::error::{AuthError, Result};
use crate::JWT_HEADER;

/// Configuration for a trusted JWT issuer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// The issuer identifier (iss claim)
    pub issuer: String,

    /// PEM-encoded verification key
    pub public_key_pem: String,

    /// Signing algorithm (default: RS256)
    #[serde(default = "default_algorithm")]
    pub algorithm: Algorithm,

    /// Allowed clock skew in seconds
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

fn default_algorithm() -> Algorithm {
    Algorithm::RS256
}

fn default_leeway() -> u64 {
    60
}

impl IssuerConfig {
    /// Create a new issuer configuration using RS256
    pub fn new(issuer: impl Into<String>, public_key_pem: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            public_key_pem: public_key_pem.into(),
            algorithm: default_algorithm(),
            leeway_secs: default_leeway(),
        }
    }

    /// Set the algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    fn decoding_key(&self) -> Result<DecodingKey> {
        let pem = self.public_key_pem.as_bytes();
        let key = match self.algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem),
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
            other => {
                return Err(AuthError::InvalidKey(format!(
                    "Algorithm {:?} needs a shared secret, not a public key",
                    other
                )))
            }
        };
        key.map_err(|e| AuthError::InvalidKey(format!("{}: {}", self.issuer, e)))
    }
}

/// Application information carried by platform-issued tokens
#[derive(Debug, Clone, Default, Deserialize)]
struct AppClaim {
    #[serde(default)]
    app_code: Option<String>,
}

/// JWT claims we care about
#[derive(Debug, Deserialize)]
struct TokenClaims {
    iss: String,
    #[serde(default)]
    app: Option<AppClaim>,
}

/// Result of verifying a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Issuer that signed the token
    pub issuer: IssuerIdentity,

    /// Calling application, when the token names one
    pub app_code: Option<String>,
}

struct TrustedIssuer {
    config: IssuerConfig,
    key: DecodingKey,
}

/// Verifies JWTs from a fixed set of trusted issuers
pub struct JwtAuthenticator {
    issuers: HashMap<String, TrustedIssuer>,
}

impl JwtAuthenticator {
    /// Create an authenticator that trusts nobody
    pub fn new() -> Self {
        Self {
            issuers: HashMap::new(),
        }
    }

    /// Add a trusted issuer. Fails when its key cannot be parsed.
    pub fn with_issuer(mut self, config: IssuerConfig) -> Result<Self> {
        let key = config.decoding_key()?;
        debug!(issuer = %config.issuer, algorithm = ?config.algorithm, "Trusting JWT issuer");
        self.issuers
            .insert(config.issuer.clone(), TrustedIssuer { config, key });
        Ok(self)
    }

    /// Number of trusted issuers
    pub fn issuer_count(&self) -> usize {
        self.issuers.len()
    }

    /// Verify a token and extract its issuer
    pub fn verify(&self, token: &str) -> Result<VerifiedToken> {
        if token.is_empty() {
            return Err(AuthError::MissingCredential(JWT_HEADER));
        }

        // Step 1: header must parse before anything else is trusted
        let header = decode_header(token).map_err(|e| AuthError::InvalidFormat(e.to_string()))?;

        // Step 2: read the unverified issuer to select a key
        let issuer = unverified_issuer(token)?;
        let trusted = self
            .issuers
            .get(&issuer)
            .ok_or_else(|| AuthError::UnknownIssuer(issuer.clone()))?;

        if header.alg != trusted.config.algorithm {
            return Err(AuthError::InvalidSignature(format!(
                "Issuer {} signs with {:?}, token uses {:?}",
                issuer, trusted.config.algorithm, header.alg
            )));
        }

        // Step 3: full verification
        let mut validation = Validation::new(trusted.config.algorithm);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.validate_aud = false;
        validation.leeway = trusted.config.leeway_secs;

        let claims = decode::<TokenClaims>(token, &trusted.key, &validation)?.claims;

        let issuer = IssuerIdentity::new(claims.iss)
            .map_err(|_| AuthError::MissingClaim("iss".into()))?;
        let app_code = claims
            .app
            .and_then(|app| app.app_code)
            .filter(|code| !code.is_empty());

        Ok(VerifiedToken { issuer, app_code })
    }
}

impl Default for JwtAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the payload segment without verifying it
fn unverified_issuer(token: &str) -> Result<String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::InvalidFormat("Invalid JWT format".into()));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| AuthError::InvalidFormat(format!("Invalid JWT payload encoding: {}", e)))?;

    let claims: serde_json::Value = serde_json::from_slice(&payload)?;

    claims
        .get("iss")
        .and_then(|v| v.as_str())
        .filter(|iss| !iss.is_empty())
        .map(String::from)
        .ok_or_else(|| AuthError::MissingClaim("iss".into()))
}
