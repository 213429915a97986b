//! HTTP request handlers for the cron service.

pub mod admin;
pub mod crons;
pub mod echo;
pub mod health;
pub mod metrics;
pub mod run;
pub mod tokens;

pub use health::health_check;
pub use metrics::metrics_handler;

use crate::errors::CronError;
use axum::body::Bytes;
use axum::extract::{rejection::QueryRejection, Query};
use serde::de::DeserializeOwned;

/// Parse an optional JSON body. An empty body yields `T::default()`.
pub(crate) fn parse_json_body<T>(body: &Bytes) -> Result<T, CronError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| CronError::validation("body", format!("Invalid JSON: {}", e)))
}

/// Unwrap a query extraction, turning a rejection into a validation error.
pub(crate) fn query_or_invalid<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, CronError> {
    query
        .map(|Query(inner)| inner)
        .map_err(|e| CronError::validation("query", e.body_text()))
}
