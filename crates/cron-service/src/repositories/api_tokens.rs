//! API tokens repository.
//!
//! Rows hold encrypted tokens only. Lookups compare ciphertexts through the
//! `md5(apitoken)` expression index, then confirm on the full value.
//!
//! # Security
//!
//! - Ciphertexts are never recorded as span fields
//! - All queries use parameterized statements

use crate::errors::CronError;
use crate::models::ApiToken;
use sqlx::PgPool;
use tracing::instrument;

const TOKEN_COLUMNS: &str =
    "id, apitoken, status, created_by, created_at, updated_at, deleted_at";

/// Repository for stored API tokens.
pub struct ApiTokensRepository;

impl ApiTokensRepository {
    /// Find a token row by ciphertext, whatever its status.
    #[instrument(skip_all)]
    pub async fn find_by_ciphertext(
        pool: &PgPool,
        ciphertext: &str,
    ) -> Result<Option<ApiToken>, CronError> {
        let token = sqlx::query_as::<_, ApiToken>(&format!(
            r#"
            SELECT {TOKEN_COLUMNS} FROM apitokens
            WHERE md5(apitoken) = md5($1) AND apitoken = $1
            LIMIT 1
            "#
        ))
        .bind(ciphertext)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Find an active (`status = 1`, not deleted) token row by ciphertext.
    #[instrument(skip_all)]
    pub async fn find_active_by_ciphertext(
        pool: &PgPool,
        ciphertext: &str,
    ) -> Result<Option<ApiToken>, CronError> {
        let token = sqlx::query_as::<_, ApiToken>(&format!(
            r#"
            SELECT {TOKEN_COLUMNS} FROM apitokens
            WHERE md5(apitoken) = md5($1) AND apitoken = $1
              AND status = 1
              AND deleted_at IS NULL
            LIMIT 1
            "#
        ))
        .bind(ciphertext)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Store a ciphertext. Returns the number of inserted rows.
    #[instrument(skip(pool, ciphertext))]
    pub async fn insert(
        pool: &PgPool,
        ciphertext: &str,
        created_by: i64,
    ) -> Result<u64, CronError> {
        let result = sqlx::query(
            r#"
            INSERT INTO apitokens (apitoken, created_by)
            VALUES ($1, $2)
            "#,
        )
        .bind(ciphertext)
        .bind(created_by)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
