//! Test server harness for E2E testing.
//!
//! Provides `TestCronServer` for spawning real cron-service instances in tests.

use crate::fixtures::test_config;
use chrono::Utc;
use common::jwt::AppClaims;
use common::secret::ExposeSecret;
use cron_service::config::Config;
use cron_service::crypto::{self, TokenCipher};
use cron_service::observability::metrics::init_metrics_recorder;
use cron_service::repositories::ApiTokensRepository;
use cron_service::routes::{self, AppState};
use cron_service::services::{token_issuer, HttpTargetClient, TargetClient};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Metrics handle shared by every test server in the process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the cron service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_run(pool: PgPool) -> anyhow::Result<()> {
///     let server = TestCronServer::spawn(pool).await?;
///     let response = reqwest::get(format!("{}/run", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestCronServer {
    addr: SocketAddr,
    pool: PgPool,
    config: Config,
    cipher: Arc<TokenCipher>,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestCronServer {
    /// Spawn a server with the default test configuration and a real HTTP
    /// target client.
    pub async fn spawn(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::spawn_with(pool, &[], None).await
    }

    /// Spawn a server with configuration overrides and, optionally, a
    /// custom target client for `GET /run`.
    ///
    /// # Arguments
    /// * `pool` - Database connection pool (typically from `#[sqlx::test]`)
    /// * `overrides` - Environment-style overrides, e.g. `[("RUN_CONCURRENCY", "2")]`
    /// * `target_client` - Client used by the dispatcher; `None` uses reqwest
    pub async fn spawn_with(
        pool: PgPool,
        overrides: &[(&str, &str)],
        target_client: Option<Arc<dyn TargetClient>>,
    ) -> Result<Self, anyhow::Error> {
        let config = test_config(overrides)?;
        let cipher = Arc::new(TokenCipher::new(config.encryption_key())?);

        let target_client: Arc<dyn TargetClient> = match target_client {
            Some(client) => client,
            None => Arc::new(HttpTargetClient::new(Duration::from_secs(
                config.run_request_timeout_seconds,
            ))?),
        };

        let state = Arc::new(AppState {
            pool: pool.clone(),
            config: config.clone(),
            cipher: cipher.clone(),
            target_client,
        });

        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            config,
            cipher,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the database pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared HTTP client for requests against this server.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Issue and store an API token, returning the bearer ciphertext.
    pub async fn issue_api_token(&self) -> Result<String, anyhow::Error> {
        let ciphertext =
            token_issuer::issue_app_token(&self.pool, &self.config, &self.cipher, Utc::now())
                .await?;
        Ok(ciphertext)
    }

    /// Sign `claims` with `secret`, encrypt with the server key and store the
    /// result, returning the bearer ciphertext.
    ///
    /// Used to build tokens the gate must reject (wrong role, foreign
    /// secret, expired).
    pub async fn store_custom_token(
        &self,
        claims: &AppClaims,
        secret: &[u8],
    ) -> Result<String, anyhow::Error> {
        let signed = crypto::sign_app_token(claims, secret)?;
        let ciphertext = self.cipher.encrypt(&signed)?;
        ApiTokensRepository::insert(&self.pool, &ciphertext, 0).await?;
        Ok(ciphertext)
    }

    /// Encrypt `plaintext` with the server key without storing it.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, anyhow::Error> {
        Ok(self.cipher.encrypt(plaintext)?)
    }

    /// The server's JWT signing secret.
    pub fn jwt_secret(&self) -> Vec<u8> {
        self.config.jwt_secret.expose_secret().as_bytes().to_vec()
    }
}

impl Drop for TestCronServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
