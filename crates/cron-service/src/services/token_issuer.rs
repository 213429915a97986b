//! API token issuance.
//!
//! Mints the signed assertion for the fixed `APP` identity, encrypts it and
//! stores the ciphertext. The duplicate check compares ciphertexts and runs
//! before the insert without a transaction, so two concurrent issuances can
//! both pass it.

use crate::config::Config;
use crate::crypto::{self, TokenCipher};
use crate::errors::CronError;
use crate::observability::metrics::record_token_issuance;
use crate::repositories::ApiTokensRepository;
use chrono::{DateTime, Utc};
use common::jwt::{AppClaims, AppIdentity, APP_USER_ID};
use common::secret::ExposeSecret;
use sqlx::PgPool;
use tracing::instrument;

/// Build the claims of the `APP` identity token issued at `issued_at`.
///
/// # Errors
///
/// `Internal` if `iat + TOKEN_TTL_SECONDS` does not fit in an `i64`.
pub fn app_claims(config: &Config, issued_at: DateTime<Utc>) -> Result<AppClaims, CronError> {
    let iat = issued_at.timestamp();

    let exp = match config.token_ttl_seconds {
        Some(ttl) => Some(iat.checked_add(ttl).ok_or_else(|| {
            CronError::Internal(format!("Token expiry overflows: iat={iat}, ttl={ttl}"))
        })?),
        None => None,
    };

    Ok(AppClaims {
        data: vec![AppIdentity::app(&config.app_email_domain)],
        iat,
        iss: config.jwt_issuer.clone(),
        aud: config.jwt_audience.clone(),
        exp,
    })
}

/// Issue an API token and return its ciphertext.
///
/// # Errors
///
/// - `Conflict("Api token already exists!")` if the same ciphertext is stored
/// - `Internal("Unable to add api token!")` if the insert affects no row
/// - `Crypto` / `Database` for signing, encryption or storage failures
#[instrument(skip_all, fields(iat = issued_at.timestamp()))]
pub async fn issue_app_token(
    pool: &PgPool,
    config: &Config,
    cipher: &TokenCipher,
    issued_at: DateTime<Utc>,
) -> Result<String, CronError> {
    let result = issue(pool, config, cipher, issued_at).await;

    let outcome = match &result {
        Ok(_) => "issued",
        Err(CronError::Conflict(_)) => "duplicate",
        Err(_) => "error",
    };
    record_token_issuance(outcome);

    result
}

async fn issue(
    pool: &PgPool,
    config: &Config,
    cipher: &TokenCipher,
    issued_at: DateTime<Utc>,
) -> Result<String, CronError> {
    let claims = app_claims(config, issued_at)?;
    let signed = crypto::sign_app_token(&claims, config.jwt_secret.expose_secret().as_bytes())?;
    let ciphertext = cipher.encrypt(&signed)?;

    if ApiTokensRepository::find_by_ciphertext(pool, &ciphertext)
        .await?
        .is_some()
    {
        tracing::info!(target: "cron.services.token", "Api token already exists");
        return Err(CronError::Conflict("Api token already exists!".to_string()));
    }

    let inserted = ApiTokensRepository::insert(pool, &ciphertext, APP_USER_ID).await?;
    if inserted == 0 {
        return Err(CronError::Internal("Unable to add api token!".to_string()));
    }

    tracing::info!(target: "cron.services.token", "Api token issued");

    Ok(ciphertext)
}
