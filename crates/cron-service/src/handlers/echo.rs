//! Diagnostic echo endpoints (`/supabase`, `/cf`, `/test`).
//!
//! Reply with the request's JSON body and query string as received. A body
//! that is empty or not JSON echoes as `{}`.

use crate::models::EchoResponse;
use axum::{body::Bytes, extract::Query, Json};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::instrument;

/// Echo body and query.
#[instrument(skip_all, name = "cron.echo")]
pub async fn echo(
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Json<EchoResponse> {
    let body = serde_json::from_slice::<Value>(&body).unwrap_or_else(|_| Value::Object(Map::new()));
    let query = query
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect::<Map<String, Value>>();

    tracing::debug!(target: "cron.handlers.echo", query_keys = query.len(), "Echo request");

    Json(EchoResponse {
        error: false,
        body,
        query: Value::Object(query),
    })
}
