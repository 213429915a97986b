//! `GET /app` - issue the application API token.

use crate::errors::CronError;
use crate::models::ApiResponse;
use crate::routes::AppState;
use crate::services::token_issuer;
use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

/// Mint, encrypt and store an API token; reply with the ciphertext.
///
/// A second call within the same second produces the same token and is
/// answered with `Api token already exists!`.
#[instrument(skip_all, name = "cron.tokens.issue")]
pub async fn issue_app_token(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<String>>, CronError> {
    let ciphertext =
        token_issuer::issue_app_token(&state.pool, &state.config, &state.cipher, Utc::now())
            .await?;

    Ok(Json(ApiResponse::success(ciphertext)))
}
