//! HTTP routes for the cron service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::crypto::TokenCipher;
use crate::errors::CronError;
use crate::handlers::{self, admin, crons, echo, run, tokens};
use crate::middleware::{http_metrics_middleware, require_app_token, AuthState};
use crate::services::TargetClient;
use axum::{
    error_handling::HandleErrorLayer,
    middleware,
    routing::{get, post},
    BoxError, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::trace::TraceLayer;

/// Request timeout for every route except `/run`.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    /// Credential store for API tokens.
    pub cipher: Arc<TokenCipher>,

    /// Client used by `GET /run` to call cron targets.
    pub target_client: Arc<dyn TargetClient>,
}

/// Build the application routes.
///
/// - `/crons`, `/crons/:cron_id` - cron registry, API token required
/// - `/run` - execution dispatcher (public)
/// - `/app` - API token issuance (public)
/// - `/createtable`, `/createtabletoken` - destructive bootstrap (public)
/// - `/supabase`, `/cf`, `/test` - echo diagnostics (public)
/// - `/health`, `/metrics` - operational (public)
///
/// `/run` waits for every target and is bounded by the per-target client
/// timeout instead of the 30 second request timeout.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        pool: state.pool.clone(),
        cipher: state.cipher.clone(),
        config: state.config.clone(),
    });

    let public_routes = Router::new()
        .route("/app", get(tokens::issue_app_token))
        .route("/createtable", get(admin::create_crons_table))
        .route("/createtabletoken", get(admin::create_api_tokens_table))
        .route("/supabase", get(echo::echo).post(echo::echo))
        .route("/cf", get(echo::echo).post(echo::echo))
        .route("/test", get(echo::echo).post(echo::echo))
        .route("/health", get(handlers::health_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route(
            "/crons",
            post(crons::create_cron)
                .get(crons::list_crons)
                .put(crons::update_crons)
                .delete(crons::delete_crons),
        )
        .route(
            "/crons/:cron_id",
            get(crons::get_cron)
                .put(crons::update_cron)
                .delete(crons::delete_cron),
        )
        .route_layer(middleware::from_fn_with_state(
            auth_state,
            require_app_token,
        ))
        .with_state(state.clone());

    let run_routes = Router::new()
        .route("/run", get(run::run_crons))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. Timeout - all routes but /run, rendered as the error envelope
    // 2. TraceLayer
    // 3. http_metrics_middleware - outermost, records every response
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_layer_error))
                .timeout(REQUEST_TIMEOUT),
        )
        .merge(run_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Convert a failure raised by a tower layer into a `CronError`.
async fn handle_layer_error(err: BoxError) -> CronError {
    if err.is::<Elapsed>() {
        tracing::warn!(
            target: "cron.routes",
            timeout_secs = REQUEST_TIMEOUT.as_secs(),
            "Request timed out"
        );
        CronError::Timeout("Request timed out".to_string())
    } else {
        CronError::Internal(format!("Unhandled middleware error: {}", err))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn slow_handler() -> &'static str {
        tokio::time::sleep(Duration::from_millis(200)).await;
        "done"
    }

    #[tokio::test]
    async fn test_timeout_renders_error_envelope() {
        let app = Router::new().route("/slow", get(slow_handler)).layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_layer_error))
                .timeout(Duration::from_millis(10)),
        );

        let response = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "error": true, "data": "Request timed out" })
        );
    }

    #[tokio::test]
    async fn test_other_layer_errors_are_internal() {
        let err: BoxError = "boom".into();
        let mapped = handle_layer_error(err).await;

        assert!(matches!(mapped, CronError::Internal(ref msg) if msg.contains("boom")));
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_config_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Config>();
    }
}
