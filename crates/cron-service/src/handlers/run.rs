//! `GET /run` - trigger every active cron target.

use crate::errors::CronError;
use crate::models::ApiResponse;
use crate::routes::AppState;
use crate::services::dispatcher;
use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::instrument;

/// Fan out to all non-deleted targets and wait for them to settle.
///
/// Per-target failures do not change the reply.
#[instrument(skip_all, name = "cron.run")]
pub async fn run_crons(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<String>>, CronError> {
    dispatcher::run_active_crons(
        &state.pool,
        state.target_client.as_ref(),
        state.config.run_concurrency,
    )
    .await?;

    Ok(Json(ApiResponse::message("Cron run successfully!")))
}
