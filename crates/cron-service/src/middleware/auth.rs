//! API token gate for the `/crons` routes.
//!
//! The bearer value is the encrypted token handed out by `GET /app`. It must
//! match an active stored row, decrypt with the service key, verify as an
//! HS256 assertion for this issuer and audience, and carry the `APP` role.
//! Verified claims are placed in request extensions.

use crate::config::Config;
use crate::crypto::{self, TokenCipher};
use crate::errors::CronError;
use crate::observability::metrics::record_auth;
use crate::repositories::ApiTokensRepository;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::IntoResponse,
};
use common::jwt::{extract_bearer, AppClaims};
use common::secret::ExposeSecret;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub pool: PgPool,
    pub cipher: Arc<TokenCipher>,
    pub config: Config,
}

/// Authentication middleware requiring a valid API token.
///
/// # Response
///
/// - 401 with the error envelope if the token is missing or invalid
/// - Otherwise continues with [`AppClaims`] in extensions
#[instrument(skip_all, name = "cron.middleware.auth")]
pub async fn require_app_token(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, CronError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let claims = match authenticate(&state, header).await {
        Ok(claims) => {
            record_auth("accepted");
            claims
        }
        Err(e) => {
            record_auth("rejected");
            return Err(e);
        }
    };

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

async fn authenticate(state: &AuthState, header: Option<&str>) -> Result<AppClaims, CronError> {
    let ciphertext = extract_bearer(header).map_err(|e| {
        tracing::debug!(target: "cron.middleware.auth", error = %e, "Bearer extraction failed");
        CronError::Unauthorized(e.to_string())
    })?;

    let stored = ApiTokensRepository::find_active_by_ciphertext(&state.pool, ciphertext).await?;
    if stored.is_none() {
        tracing::debug!(target: "cron.middleware.auth", "Api token not found or inactive");
        return Err(invalid_token());
    }

    let signed = state.cipher.decrypt(ciphertext).map_err(|e| {
        tracing::warn!(target: "cron.middleware.auth", error = %e, "Stored api token failed to decrypt");
        invalid_token()
    })?;

    let claims = crypto::verify_app_token(
        &signed,
        state.config.jwt_secret.expose_secret().as_bytes(),
        &state.config.jwt_issuer,
        &state.config.jwt_audience,
    )?;

    if !claims.has_app_role() {
        tracing::debug!(target: "cron.middleware.auth", "Api token lacks APP role");
        return Err(invalid_token());
    }

    Ok(claims)
}

fn invalid_token() -> CronError {
    CronError::Unauthorized("The api token is invalid".to_string())
}
