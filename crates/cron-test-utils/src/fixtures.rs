//! Deterministic configuration fixtures.

use base64::{engine::general_purpose, Engine as _};
use cron_service::config::{Config, ConfigError};
use std::collections::HashMap;

/// HMAC secret used to sign test API tokens.
pub const TEST_JWT_SECRET: &str = "cron-test-secret-cron-test-secret-0123";

/// Token encryption key used by test servers.
pub const TEST_ENCRYPTION_KEY: [u8; 32] = [0x42; 32];

/// Environment variables of a test configuration.
///
/// `DATABASE_URL` is a placeholder; test servers use the pool handed to them.
pub fn test_config_vars() -> HashMap<String, String> {
    HashMap::from([
        (
            "DATABASE_URL".to_string(),
            "postgresql://unused/cron_test".to_string(),
        ),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("JWT_SECRET".to_string(), TEST_JWT_SECRET.to_string()),
        (
            "TOKEN_ENCRYPTION_KEY".to_string(),
            general_purpose::STANDARD.encode(TEST_ENCRYPTION_KEY),
        ),
        ("RUN_REQUEST_TIMEOUT_SECONDS".to_string(), "5".to_string()),
    ])
}

/// Test configuration with `overrides` applied on top of the defaults.
pub fn test_config(overrides: &[(&str, &str)]) -> Result<Config, ConfigError> {
    let mut vars = test_config_vars();
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }
    Config::from_vars(&vars)
}
