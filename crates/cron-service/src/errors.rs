//! Cron service error types.
//!
//! Every handler failure is a `CronError`, and every `CronError` renders as
//! the uniform envelope `{"error": true, "data": "<message>"}`. Handled
//! errors are answered with HTTP 200; authentication failures use 401 and
//! requests cut off by the router timeout use 408.
//! Storage errors are classified here once: unique violations become
//! `Conflict`, everything else stays `Database`.

use crate::models::ApiResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// PostgreSQL SQLSTATE for unique constraint violations.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Cron service error type.
#[derive(Debug, Error)]
pub enum CronError {
    #[error("\"{field}\" is {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Timeout(String),
}

impl CronError {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        CronError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status code used for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CronError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CronError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::OK,
        }
    }

    /// Bounded label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CronError::Validation { .. } => "validation",
            CronError::NotFound(_) => "not_found",
            CronError::Conflict(_) => "conflict",
            CronError::Unauthorized(_) => "unauthorized",
            CronError::Database(_) => "database",
            CronError::Crypto(_) => "crypto",
            CronError::Internal(_) => "internal",
            CronError::Timeout(_) => "timeout",
        }
    }

    /// Message placed in the envelope's `data` field.
    pub fn client_message(&self) -> String {
        match self {
            CronError::Database(err) => err.clone(),
            CronError::Crypto(_) => "An internal cryptographic error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for CronError {
    fn into_response(self) -> Response {
        match &self {
            CronError::Database(err) => {
                tracing::error!(target: "cron.database", error = %err, "Database operation failed");
            }
            CronError::Crypto(err) => {
                tracing::error!(target: "cron.crypto", error = %err, "Cryptographic operation failed");
            }
            CronError::Internal(err) => {
                tracing::error!(target: "cron.internal", error = %err, "Internal error");
            }
            other => {
                tracing::debug!(target: "cron.errors", kind = other.kind(), error = %other, "Request failed");
            }
        }

        let status = self.status_code();
        let body = ApiResponse::failure(self.client_message());

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"cron-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Convert sqlx errors to CronError, classifying unique violations as conflicts.
impl From<sqlx::Error> for CronError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                return CronError::Conflict(conflict_message(&constraint));
            }
        }

        CronError::Database(err.to_string())
    }
}

/// Client-facing message for a unique constraint violation.
fn conflict_message(constraint: &str) -> String {
    match constraint {
        "crons_cron_key" => "Cron already exists!".to_string(),
        other => format!("Duplicate entry violates '{}'", other),
    }
}
