//! Cron service configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use base64::{engine::general_purpose, Engine as _};
use common::secret::{ExposeSecret, SecretBox, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default JWT issuer.
pub const DEFAULT_JWT_ISSUER: &str = "cron-api";

/// Default JWT audience.
pub const DEFAULT_JWT_AUDIENCE: &str = "cron-api-clients";

/// Default domain for the application identity e-mail (`app@<domain>`).
pub const DEFAULT_APP_EMAIL_DOMAIN: &str = "lcapis.app";

/// Upper bound of `TOKEN_TTL_SECONDS` (100 years).
pub const MAX_TOKEN_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

/// Default maximum number of in-flight outbound calls during a run.
pub const DEFAULT_RUN_CONCURRENCY: usize = 10;

/// Default per-target request timeout in seconds.
pub const DEFAULT_RUN_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default database pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Minimum HMAC secret length in bytes for HS256.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Required length of the token encryption key in bytes (AES-256).
pub const TOKEN_ENCRYPTION_KEY_BYTES: usize = 32;

/// Cron service configuration.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: SecretString,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// HMAC secret used to sign API tokens.
    pub jwt_secret: SecretString,

    /// `iss` claim of issued API tokens.
    pub jwt_issuer: String,

    /// `aud` claim of issued API tokens.
    pub jwt_audience: String,

    /// Lifetime of issued API tokens. `None` means non-expiring.
    pub token_ttl_seconds: Option<i64>,

    /// AES-256 key of the credential store.
    pub token_encryption_key: Arc<SecretBox<Vec<u8>>>,

    /// Domain of the application identity e-mail.
    pub app_email_domain: String,

    /// Maximum number of outbound calls in flight during a run.
    pub run_concurrency: usize,

    /// Timeout applied to each outbound call during a run.
    pub run_request_timeout_seconds: u64,

    /// Maximum database pool size.
    pub db_max_connections: u32,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("token_encryption_key", &"[REDACTED]")
            .field("app_email_domain", &self.app_email_domain)
            .field("run_concurrency", &self.run_concurrency)
            .field(
                "run_request_timeout_seconds",
                &self.run_request_timeout_seconds,
            )
            .field("db_max_connections", &self.db_max_connections)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT secret: {0}")]
    InvalidJwtSecret(String),

    #[error("Invalid token encryption key: {0}")]
    InvalidEncryptionKey(String),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Invalid value for {name}: {reason}")]
    InvalidNumber { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwt_secret = vars
            .get("JWT_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?
            .clone();

        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::InvalidJwtSecret(format!(
                "Expected at least {} bytes, got {}",
                MIN_JWT_SECRET_BYTES,
                jwt_secret.len()
            )));
        }

        let jwt_issuer = vars
            .get("JWT_ISSUER")
            .cloned()
            .unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string());

        let jwt_audience = vars
            .get("JWT_AUDIENCE")
            .cloned()
            .unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.to_string());

        let token_ttl_seconds = match vars.get("TOKEN_TTL_SECONDS") {
            Some(value) => {
                let ttl = parse_positive::<i64>("TOKEN_TTL_SECONDS", value)?;
                if ttl > MAX_TOKEN_TTL_SECONDS {
                    return Err(ConfigError::InvalidNumber {
                        name: "TOKEN_TTL_SECONDS".to_string(),
                        reason: format!("must be at most {}", MAX_TOKEN_TTL_SECONDS),
                    });
                }
                Some(ttl)
            }
            None => None,
        };

        let key_base64 = vars
            .get("TOKEN_ENCRYPTION_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("TOKEN_ENCRYPTION_KEY".to_string()))?;

        let token_encryption_key = general_purpose::STANDARD
            .decode(key_base64)
            .map_err(ConfigError::Base64Error)?;

        if token_encryption_key.len() != TOKEN_ENCRYPTION_KEY_BYTES {
            return Err(ConfigError::InvalidEncryptionKey(format!(
                "Expected {} bytes, got {}",
                TOKEN_ENCRYPTION_KEY_BYTES,
                token_encryption_key.len()
            )));
        }

        let app_email_domain = vars
            .get("APP_EMAIL_DOMAIN")
            .cloned()
            .unwrap_or_else(|| DEFAULT_APP_EMAIL_DOMAIN.to_string());

        let run_concurrency = match vars.get("RUN_CONCURRENCY") {
            Some(value) => parse_positive::<usize>("RUN_CONCURRENCY", value)?,
            None => DEFAULT_RUN_CONCURRENCY,
        };

        let run_request_timeout_seconds = match vars.get("RUN_REQUEST_TIMEOUT_SECONDS") {
            Some(value) => parse_positive::<u64>("RUN_REQUEST_TIMEOUT_SECONDS", value)?,
            None => DEFAULT_RUN_REQUEST_TIMEOUT_SECONDS,
        };

        let db_max_connections = match vars.get("DB_MAX_CONNECTIONS") {
            Some(value) => parse_positive::<u32>("DB_MAX_CONNECTIONS", value)?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        Ok(Config {
            database_url: SecretString::from(database_url),
            bind_address,
            jwt_secret: SecretString::from(jwt_secret),
            jwt_issuer,
            jwt_audience,
            token_ttl_seconds,
            token_encryption_key: Arc::new(SecretBox::new(Box::new(token_encryption_key))),
            app_email_domain,
            run_concurrency,
            run_request_timeout_seconds,
            db_max_connections,
        })
    }

    /// Raw token encryption key bytes.
    pub fn encryption_key(&self) -> &[u8] {
        self.token_encryption_key.expose_secret()
    }
}

/// Parse a strictly positive integer variable.
fn parse_positive<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let parsed: T = value.trim().parse().map_err(|e| ConfigError::InvalidNumber {
        name: name.to_string(),
        reason: format!("must be a valid positive integer, got '{}': {}", value, e),
    })?;

    if parsed <= T::default() {
        return Err(ConfigError::InvalidNumber {
            name: name.to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    Ok(parsed)
}
