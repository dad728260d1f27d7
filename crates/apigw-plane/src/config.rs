//! Server configuration from `APIGW_PLANE_*` environment variables

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

use apigw_auth::Algorithm;

const PREFIX: &str = "APIGW_PLANE_";

/// Invalid configuration value
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },

    #[error("{name} requires {requires}")]
    Incomplete { name: String, requires: String },
}

/// Trusted JWT issuer for the external endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtIssuerSettings {
    /// Expected `iss` claim
    pub issuer: String,
    /// PEM file holding the issuer's verification key
    pub public_key_file: PathBuf,
    /// Signing algorithm of the issuer
    pub algorithm: Algorithm,
}

/// Control plane configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneConfig {
    /// Tracing max level
    pub log_level: Level,
    /// Listen address
    pub bind: IpAddr,
    /// Listen port
    pub port: u16,
    /// Deadline applied to every request
    pub request_timeout: Duration,
    /// PostgreSQL URL; the memory backend is used when unset
    pub database_url: Option<String>,
    /// PostgreSQL pool size
    pub database_max_connections: u32,
    /// JSON seed for the memory backend
    pub seed_file: Option<PathBuf>,
    /// Trusted JWT issuer, if the external endpoints are enabled
    pub jwt: Option<JwtIssuerSettings>,
    /// How long instance lookups are cached
    pub instance_cache_ttl: Duration,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            bind: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            request_timeout: Duration::from_millis(5000),
            database_url: None,
            database_max_connections: 10,
            seed_file: None,
            jwt: None,
            instance_cache_ttl: Duration::from_secs(60),
        }
    }
}

impl PlaneConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which receives full variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{PREFIX}{key}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let jwt = match (get("JWT_ISSUER"), get("JWT_PUBLIC_KEY_FILE")) {
            (Some(issuer), Some(file)) => Some(JwtIssuerSettings {
                issuer,
                public_key_file: PathBuf::from(file),
                algorithm: parse("JWT_ALGORITHM", get("JWT_ALGORITHM"), Algorithm::RS256)?,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    name: format!("{PREFIX}JWT_ISSUER"),
                    requires: format!("{PREFIX}JWT_PUBLIC_KEY_FILE"),
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    name: format!("{PREFIX}JWT_PUBLIC_KEY_FILE"),
                    requires: format!("{PREFIX}JWT_ISSUER"),
                })
            }
        };

        let request_timeout_ms: u64 = parse("REQUEST_TIMEOUT_MS", get("REQUEST_TIMEOUT_MS"), 5000)?;
        if request_timeout_ms == 0 {
            return Err(invalid("REQUEST_TIMEOUT_MS", "0", "must be positive"));
        }

        Ok(Self {
            log_level: parse("LOG_LEVEL", get("LOG_LEVEL"), defaults.log_level)?,
            bind: parse("BIND", get("BIND"), defaults.bind)?,
            port: parse("PORT", get("PORT"), defaults.port)?,
            request_timeout: Duration::from_millis(request_timeout_ms),
            database_url: get("DATABASE_URL"),
            database_max_connections: parse(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                defaults.database_max_connections,
            )?,
            seed_file: get("SEED_FILE").map(PathBuf::from),
            jwt,
            instance_cache_ttl: Duration::from_secs(parse(
                "INSTANCE_CACHE_TTL_SECS",
                get("INSTANCE_CACHE_TTL_SECS"),
                defaults.instance_cache_ttl.as_secs(),
            )?),
        })
    }
}

fn parse<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e: T::Err| invalid(key, &value, &e.to_string())),
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name: format!("{PREFIX}{key}"),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<PlaneConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PlaneConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, PlaneConfig::default());
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("APIGW_PLANE_PORT", "9090"),
            ("APIGW_PLANE_BIND", "127.0.0.1"),
            ("APIGW_PLANE_LOG_LEVEL", "debug"),
            ("APIGW_PLANE_REQUEST_TIMEOUT_MS", "250"),
            ("APIGW_PLANE_JWT_ISSUER", "bk-apigateway"),
            ("APIGW_PLANE_JWT_PUBLIC_KEY_FILE", "/etc/apigw/jwt.pem"),
            ("APIGW_PLANE_JWT_ALGORITHM", "EdDSA"),
        ])
        .unwrap();

        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.bind, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(cfg.log_level, Level::DEBUG);
        assert_eq!(cfg.request_timeout, Duration::from_millis(250));
        let jwt = cfg.jwt.unwrap();
        assert_eq!(jwt.issuer, "bk-apigateway");
        assert_eq!(jwt.algorithm, Algorithm::EdDSA);
    }

    #[test]
    fn test_invalid_port() {
        let err = config(&[("APIGW_PLANE_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("APIGW_PLANE_PORT"));
    }

    #[test]
    fn test_issuer_without_key_file() {
        let err = config(&[("APIGW_PLANE_JWT_ISSUER", "bk-apigateway")]).unwrap_err();
        assert!(matches!(err, ConfigError::Incomplete { .. }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(config(&[("APIGW_PLANE_REQUEST_TIMEOUT_MS", "0")]).is_err());
    }
}
