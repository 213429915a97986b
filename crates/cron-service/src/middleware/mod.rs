//! HTTP middleware for the cron service.
//!
//! - `auth` - API token gate for the `/crons` routes
//! - `http_metrics` - request metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{require_app_token, AuthState};
pub use http_metrics::http_metrics_middleware;
