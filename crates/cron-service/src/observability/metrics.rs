//! Metrics definitions for the cron service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `cron_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP verbs only
//! - `endpoint`: the fixed route table, `:cron_id` collapsed, unknown paths as `/other`
//! - `status`: success, error, timeout
//! - `outcome`: bounded by code
//!
//! Target URLs never appear as label values.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle that renders
/// `/metrics`.
///
/// # Errors
///
/// Returns an error if a recorder is already installed in this process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("cron_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Runs last up to the per-target client timeout.
        .set_buckets_for_metric(
            Matcher::Prefix("cron_run_duration".to_string()),
            &[0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000, 30.000, 60.000],
        )
        .map_err(|e| format!("Failed to set run duration buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("cron_dispatch_duration".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000, 30.000],
        )
        .map_err(|e| format!("Failed to set dispatch duration buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `cron_http_requests_total`, `cron_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("cron_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("cron_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize an HTTP status code into success/error/timeout.
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto the fixed route table.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/crons" => "/crons",
        "/run" => "/run",
        "/app" => "/app",
        "/createtable" => "/createtable",
        "/createtabletoken" => "/createtabletoken",
        "/supabase" => "/supabase",
        "/cf" => "/cf",
        "/test" => "/test",
        "/health" => "/health",
        "/metrics" => "/metrics",
        other => match other.strip_prefix("/crons/") {
            Some(rest) if !rest.is_empty() && !rest.contains('/') => "/crons/{cron_id}",
            _ => "/other",
        },
    }
}

// ============================================================================
// Dispatcher Metrics
// ============================================================================

/// Record one outbound call made during a run.
///
/// Metric: `cron_dispatch_total`, `cron_dispatch_duration_seconds`
/// Labels: `outcome` (success, http_error, transport_error)
pub fn record_dispatch(outcome: &'static str, duration: Duration) {
    histogram!("cron_dispatch_duration_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());

    counter!("cron_dispatch_total", "outcome" => outcome).increment(1);
}

/// Record a completed run.
///
/// Metric: `cron_runs_total`, `cron_run_duration_seconds`, `cron_run_targets`
pub fn record_run(targets: usize, failed: usize, duration: Duration) {
    let status = if failed == 0 { "success" } else { "partial" };

    histogram!("cron_run_duration_seconds").record(duration.as_secs_f64());
    histogram!("cron_run_targets").record(targets as f64);
    counter!("cron_runs_total", "status" => status).increment(1);
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record an API token issuance attempt.
///
/// Metric: `cron_token_issuance_total`
/// Labels: `outcome` (issued, duplicate, error)
pub fn record_token_issuance(outcome: &'static str) {
    counter!("cron_token_issuance_total", "outcome" => outcome).increment(1);
}

/// Record an authentication decision of the API token gate.
///
/// Metric: `cron_auth_total`
/// Labels: `outcome` (accepted, rejected)
pub fn record_auth(outcome: &'static str) {
    counter!("cron_auth_total", "outcome" => outcome).increment(1);
}
