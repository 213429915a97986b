//! Crons repository for database operations.
//!
//! Every statement is a single parameterized query; batch operations that
//! touch several columns issue independent statements and are not wrapped in
//! a transaction. `updated_at` is bumped explicitly on every UPDATE.

use crate::errors::CronError;
use crate::models::{CronEntry, DeletedAtAction};
use sqlx::PgPool;
use tracing::instrument;

const CRON_COLUMNS: &str = "cron_id, cron, status, created_at, updated_at, deleted_at";

/// Repository for cron rows.
pub struct CronsRepository;

impl CronsRepository {
    /// Insert a new cron value and return its id.
    ///
    /// A duplicate value surfaces as `CronError::Conflict`.
    #[instrument(skip_all)]
    pub async fn insert(pool: &PgPool, cron: &str) -> Result<i64, CronError> {
        let cron_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO crons (cron)
            VALUES ($1)
            RETURNING cron_id
            "#,
        )
        .bind(cron)
        .fetch_one(pool)
        .await?;

        Ok(cron_id)
    }

    /// Fetch a non-deleted row by id.
    #[instrument(skip(pool))]
    pub async fn get_by_id(pool: &PgPool, cron_id: i64) -> Result<Option<CronEntry>, CronError> {
        let entry = sqlx::query_as::<_, CronEntry>(&format!(
            "SELECT {CRON_COLUMNS} FROM crons WHERE cron_id = $1 AND deleted_at IS NULL"
        ))
        .bind(cron_id)
        .fetch_optional(pool)
        .await?;

        Ok(entry)
    }

    /// Fetch a non-deleted row by its (normalized) value.
    #[instrument(skip_all)]
    pub async fn get_by_value(pool: &PgPool, cron: &str) -> Result<Option<CronEntry>, CronError> {
        let entry = sqlx::query_as::<_, CronEntry>(&format!(
            "SELECT {CRON_COLUMNS} FROM crons WHERE cron = $1 AND deleted_at IS NULL"
        ))
        .bind(cron)
        .fetch_optional(pool)
        .await?;

        Ok(entry)
    }

    /// Fetch a row by id, including soft-deleted rows.
    #[instrument(skip(pool))]
    pub async fn find_by_id_any(
        pool: &PgPool,
        cron_id: i64,
    ) -> Result<Option<CronEntry>, CronError> {
        let entry = sqlx::query_as::<_, CronEntry>(&format!(
            "SELECT {CRON_COLUMNS} FROM crons WHERE cron_id = $1"
        ))
        .bind(cron_id)
        .fetch_optional(pool)
        .await?;

        Ok(entry)
    }

    /// Fetch a row by value, including soft-deleted rows.
    #[instrument(skip_all)]
    pub async fn find_by_value_any(
        pool: &PgPool,
        cron: &str,
    ) -> Result<Option<CronEntry>, CronError> {
        let entry = sqlx::query_as::<_, CronEntry>(&format!(
            "SELECT {CRON_COLUMNS} FROM crons WHERE cron = $1"
        ))
        .bind(cron)
        .fetch_optional(pool)
        .await?;

        Ok(entry)
    }

    /// List rows ordered by id.
    ///
    /// Without `ids`, soft-deleted rows are excluded. With `ids`, the rows
    /// carrying those ids are returned whether soft-deleted or not. A `None`
    /// limit is unbounded.
    #[instrument(skip(pool, ids), fields(id_count = ids.map(<[i64]>::len)))]
    pub async fn list(
        pool: &PgPool,
        ids: Option<&[i64]>,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<CronEntry>, CronError> {
        let entries = match ids {
            Some(ids) => {
                sqlx::query_as::<_, CronEntry>(&format!(
                    r#"
                    SELECT {CRON_COLUMNS} FROM crons
                    WHERE cron_id = ANY($1)
                    ORDER BY cron_id
                    OFFSET $2
                    LIMIT $3
                    "#
                ))
                .bind(ids)
                .bind(offset)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CronEntry>(&format!(
                    r#"
                    SELECT {CRON_COLUMNS} FROM crons
                    WHERE deleted_at IS NULL
                    ORDER BY cron_id
                    OFFSET $1
                    LIMIT $2
                    "#
                ))
                .bind(offset)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(entries)
    }

    /// Partially update one row. `None` fields keep their stored value.
    ///
    /// Returns the number of affected rows.
    #[instrument(skip(pool, cron))]
    pub async fn update(
        pool: &PgPool,
        cron_id: i64,
        cron: Option<&str>,
        status: Option<i16>,
        deleted_at: Option<DeletedAtAction>,
    ) -> Result<u64, CronError> {
        let result = sqlx::query(
            r#"
            UPDATE crons
            SET cron = COALESCE($2, cron),
                status = COALESCE($3, status),
                deleted_at = CASE $4
                    WHEN 'restore' THEN NULL
                    WHEN 'soft_delete' THEN NOW()
                    ELSE deleted_at
                END,
                updated_at = NOW()
            WHERE cron_id = $1
            "#,
        )
        .bind(cron_id)
        .bind(cron)
        .bind(status)
        .bind(deleted_at.map(action_label))
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Ids among `ids` that exist, soft-deleted or not.
    #[instrument(skip_all, fields(id_count = ids.len()))]
    pub async fn existing_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<i64>, CronError> {
        let found: Vec<i64> = sqlx::query_scalar(
            "SELECT cron_id FROM crons WHERE cron_id = ANY($1) ORDER BY cron_id",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(found)
    }

    /// Set or clear the soft-delete marker on a set of rows.
    #[instrument(skip(pool, ids), fields(id_count = ids.len()))]
    pub async fn set_deleted_at(
        pool: &PgPool,
        ids: &[i64],
        action: DeletedAtAction,
    ) -> Result<u64, CronError> {
        let sql = match action {
            DeletedAtAction::Restore => {
                "UPDATE crons SET deleted_at = NULL, updated_at = NOW() WHERE cron_id = ANY($1)"
            }
            DeletedAtAction::SoftDelete => {
                "UPDATE crons SET deleted_at = NOW(), updated_at = NOW() WHERE cron_id = ANY($1)"
            }
        };

        let result = sqlx::query(sql).bind(ids).execute(pool).await?;

        Ok(result.rows_affected())
    }

    /// Set the status flag on a set of rows.
    #[instrument(skip(pool, ids), fields(id_count = ids.len()))]
    pub async fn set_status(pool: &PgPool, ids: &[i64], status: i16) -> Result<u64, CronError> {
        let result = sqlx::query(
            "UPDATE crons SET status = $2, updated_at = NOW() WHERE cron_id = ANY($1)",
        )
        .bind(ids)
        .bind(status)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Hard-delete one row by id.
    #[instrument(skip(pool))]
    pub async fn delete_by_id(pool: &PgPool, cron_id: i64) -> Result<u64, CronError> {
        let result = sqlx::query("DELETE FROM crons WHERE cron_id = $1")
            .bind(cron_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Hard-delete one row by value.
    #[instrument(skip_all)]
    pub async fn delete_by_value(pool: &PgPool, cron: &str) -> Result<u64, CronError> {
        let result = sqlx::query("DELETE FROM crons WHERE cron = $1")
            .bind(cron)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Hard-delete a set of rows by id.
    #[instrument(skip(pool, ids), fields(id_count = ids.len()))]
    pub async fn delete_ids(pool: &PgPool, ids: &[i64]) -> Result<u64, CronError> {
        let result = sqlx::query("DELETE FROM crons WHERE cron_id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Number of soft-deleted rows.
    #[instrument(skip_all)]
    pub async fn count_soft_deleted(pool: &PgPool) -> Result<i64, CronError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM crons WHERE deleted_at IS NOT NULL")
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    /// Hard-delete every soft-deleted row.
    #[instrument(skip_all)]
    pub async fn purge_soft_deleted(pool: &PgPool) -> Result<u64, CronError> {
        let result = sqlx::query("DELETE FROM crons WHERE deleted_at IS NOT NULL")
            .execute(pool)
            .await?;

        tracing::info!(
            target: "cron.repository.crons",
            purged = result.rows_affected(),
            "Purged soft-deleted crons"
        );

        Ok(result.rows_affected())
    }

    /// Values of every non-deleted row. The status flag is not consulted.
    #[instrument(skip_all)]
    pub async fn list_active_values(pool: &PgPool) -> Result<Vec<String>, CronError> {
        let values: Vec<String> = sqlx::query_scalar(
            "SELECT cron FROM crons WHERE deleted_at IS NULL ORDER BY cron_id",
        )
        .fetch_all(pool)
        .await?;

        Ok(values)
    }
}

fn action_label(action: DeletedAtAction) -> &'static str {
    match action {
        DeletedAtAction::Restore => "restore",
        DeletedAtAction::SoftDelete => "soft_delete",
    }
}
