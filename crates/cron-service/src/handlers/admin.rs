//! Schema bootstrap endpoints. Both drop the table before recreating it.

use crate::errors::CronError;
use crate::models::ApiResponse;
use crate::repositories::SchemaRepository;
use crate::routes::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::instrument;

/// `GET /createtable` - recreate `crons`.
#[instrument(skip_all, name = "cron.admin.create_crons_table")]
pub async fn create_crons_table(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<String>>, CronError> {
    SchemaRepository::recreate_crons_table(&state.pool).await?;

    Ok(Json(ApiResponse::message("Table crons created successfully!")))
}

/// `GET /createtabletoken` - recreate `apitokens`.
#[instrument(skip_all, name = "cron.admin.create_api_tokens_table")]
pub async fn create_api_tokens_table(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<String>>, CronError> {
    SchemaRepository::recreate_api_tokens_table(&state.pool).await?;

    Ok(Json(ApiResponse::message(
        "Table apitokens created successfully!",
    )))
}
