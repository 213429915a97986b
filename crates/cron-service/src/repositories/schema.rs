//! Destructive table (re)creation backing the bootstrap endpoints.
//!
//! The DDL mirrors `migrations/`. Each call drops the table first, so every
//! stored row is lost.

use crate::errors::CronError;
use sqlx::PgPool;
use tracing::instrument;

const CREATE_CRONS: &str = r#"
CREATE TABLE crons (
    cron_id BIGSERIAL PRIMARY KEY,
    cron VARCHAR(255) NOT NULL,
    status SMALLINT NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at TIMESTAMPTZ NULL DEFAULT NULL,
    CONSTRAINT crons_cron_key UNIQUE (cron),
    CONSTRAINT crons_status_check CHECK (status IN (0, 1))
)
"#;

const CREATE_API_TOKENS: &str = r#"
CREATE TABLE apitokens (
    id BIGSERIAL PRIMARY KEY,
    apitoken TEXT NOT NULL,
    status SMALLINT NOT NULL DEFAULT 1,
    created_by BIGINT NULL DEFAULT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at TIMESTAMPTZ NULL DEFAULT NULL
)
"#;

/// Repository for schema bootstrap.
pub struct SchemaRepository;

impl SchemaRepository {
    /// Drop and recreate the `crons` table.
    #[instrument(skip_all)]
    pub async fn recreate_crons_table(pool: &PgPool) -> Result<(), CronError> {
        sqlx::query("DROP TABLE IF EXISTS crons")
            .execute(pool)
            .await?;
        sqlx::query(CREATE_CRONS).execute(pool).await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_crons_deleted_at ON crons (deleted_at)")
            .execute(pool)
            .await?;

        tracing::warn!(target: "cron.repository.schema", table = "crons", "Table recreated");
        Ok(())
    }

    /// Drop and recreate the `apitokens` table.
    #[instrument(skip_all)]
    pub async fn recreate_api_tokens_table(pool: &PgPool) -> Result<(), CronError> {
        sqlx::query("DROP TABLE IF EXISTS apitokens")
            .execute(pool)
            .await?;
        sqlx::query(CREATE_API_TOKENS).execute(pool).await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_apitokens_apitoken ON apitokens (md5(apitoken))",
        )
        .execute(pool)
        .await?;

        tracing::warn!(target: "cron.repository.schema", table = "apitokens", "Table recreated");
        Ok(())
    }
}
