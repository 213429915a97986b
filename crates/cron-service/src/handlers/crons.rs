//! Cron registry handlers (`/crons`).
//!
//! Every response uses the `{error, data}` envelope; failures are
//! `CronError`s and rendered by its `IntoResponse`.

use super::{parse_json_body, query_or_invalid};
use crate::errors::CronError;
use crate::models::{
    parse_cron_id, ApiResponse, BatchDeleteRequest, BatchUpdateRequest, CreateCronRequest,
    CronEntry, DeleteCronRequest, GetCronQuery, ListCronsQuery, UpdateCronRequest,
};
use crate::repositories::CronsRepository;
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

type Message = Json<ApiResponse<String>>;

fn cron_not_found() -> CronError {
    CronError::NotFound("Cron not found!".to_string())
}

fn crons_not_found() -> CronError {
    CronError::NotFound("Crons not found!".to_string())
}

/// `POST /crons` - insert a cron value.
#[instrument(skip_all, name = "cron.crons.create")]
pub async fn create_cron(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Message, CronError> {
    let request: CreateCronRequest = parse_json_body(&body)?;
    let cron = request.validate()?;

    let cron_id = CronsRepository::insert(&state.pool, &cron).await?;
    tracing::info!(target: "cron.handlers.crons", cron_id, "Cron added");

    Ok(Json(ApiResponse::message("Cron added successfully!")))
}

/// `GET /crons/:cron_id` - one non-deleted row, by id or by the `cron` query.
///
/// Returns an array (empty when nothing matches).
#[instrument(skip_all, name = "cron.crons.get")]
pub async fn get_cron(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    query: Result<Query<GetCronQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<CronEntry>>>, CronError> {
    let cron_id = parse_cron_id(&raw_id)?;
    let lookup = query_or_invalid(query)?.validate()?;

    let entry = match lookup {
        Some(cron) => CronsRepository::get_by_value(&state.pool, &cron).await?,
        None => CronsRepository::get_by_id(&state.pool, cron_id).await?,
    };

    Ok(Json(ApiResponse::success(entry.into_iter().collect())))
}

/// `GET /crons` - list rows with optional id filter and paging.
#[instrument(skip_all, name = "cron.crons.list")]
pub async fn list_crons(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListCronsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<CronEntry>>>, CronError> {
    let filter = query_or_invalid(query)?.validate()?;

    let rows = CronsRepository::list(
        &state.pool,
        filter.ids.as_deref(),
        filter.offset,
        filter.limit,
    )
    .await?;

    Ok(Json(ApiResponse::success(rows)))
}

/// `PUT /crons/:cron_id` - partial update of one row (soft-deleted included).
#[instrument(skip_all, name = "cron.crons.update")]
pub async fn update_cron(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Message, CronError> {
    let cron_id = parse_cron_id(&raw_id)?;
    let request: UpdateCronRequest = parse_json_body(&body)?;
    let update = request.validate()?;

    if CronsRepository::find_by_id_any(&state.pool, cron_id)
        .await?
        .is_none()
    {
        return Err(cron_not_found());
    }

    CronsRepository::update(
        &state.pool,
        cron_id,
        update.cron.as_deref(),
        update.status,
        update.deleted_at,
    )
    .await?;

    Ok(Json(ApiResponse::message("Cron updated successfully!")))
}

/// `PUT /crons` - set `deleted_at` and/or `status` on a set of rows.
///
/// The two columns are written by independent statements.
#[instrument(skip_all, name = "cron.crons.update_batch")]
pub async fn update_crons(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Message, CronError> {
    let request: BatchUpdateRequest = parse_json_body(&body)?;
    let update = request.validate()?;

    let ids = if update.ids.is_empty() {
        Vec::new()
    } else {
        CronsRepository::existing_ids(&state.pool, &update.ids).await?
    };
    if ids.is_empty() {
        return Err(crons_not_found());
    }

    if let Some(action) = update.deleted_at {
        CronsRepository::set_deleted_at(&state.pool, &ids, action).await?;
    }
    if let Some(status) = update.status {
        CronsRepository::set_status(&state.pool, &ids, status).await?;
    }

    Ok(Json(ApiResponse::message("Crons updated successfully!")))
}

/// `DELETE /crons/:cron_id` - hard delete by id, or by the body's `cron`.
#[instrument(skip_all, name = "cron.crons.delete")]
pub async fn delete_cron(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Message, CronError> {
    let cron_id = parse_cron_id(&raw_id)?;
    let request: DeleteCronRequest = parse_json_body(&body)?;

    match request.validate()? {
        Some(cron) => {
            if CronsRepository::find_by_value_any(&state.pool, &cron)
                .await?
                .is_none()
            {
                return Err(cron_not_found());
            }
            CronsRepository::delete_by_value(&state.pool, &cron).await?;
        }
        None => {
            if CronsRepository::find_by_id_any(&state.pool, cron_id)
                .await?
                .is_none()
            {
                return Err(cron_not_found());
            }
            CronsRepository::delete_by_id(&state.pool, cron_id).await?;
        }
    }

    Ok(Json(ApiResponse::message("Cron deleted successfully!")))
}

/// `DELETE /crons` - delete the given ids, or purge every soft-deleted row.
#[instrument(skip_all, name = "cron.crons.delete_batch")]
pub async fn delete_crons(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Message, CronError> {
    let request: BatchDeleteRequest = parse_json_body(&body)?;

    match request.validate()? {
        Some(requested) => {
            let ids = if requested.is_empty() {
                Vec::new()
            } else {
                CronsRepository::existing_ids(&state.pool, &requested).await?
            };
            if ids.is_empty() {
                return Err(crons_not_found());
            }
            CronsRepository::delete_ids(&state.pool, &ids).await?;
        }
        None => {
            if CronsRepository::count_soft_deleted(&state.pool).await? == 0 {
                return Err(crons_not_found());
            }
            if CronsRepository::purge_soft_deleted(&state.pool).await? == 0 {
                return Err(CronError::NotFound(
                    "Crons must marked as deleted!".to_string(),
                ));
            }
        }
    }

    Ok(Json(ApiResponse::message("Crons deleted successfully!")))
}
