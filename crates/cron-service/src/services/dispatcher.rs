//! Execution dispatcher for `GET /run`.
//!
//! Issues one outbound GET per active cron target with at most N calls in
//! flight, and returns once every call has settled. Individual outcomes are
//! folded into a [`RunSummary`] for logs and metrics; the caller only learns
//! that the run completed.
//!
//! Outbound calls go through [`TargetClient`] so the fan-out can be driven by
//! an instrumented client in tests.

use crate::errors::CronError;
use crate::observability::metrics::{record_dispatch, record_run};
use crate::repositories::CronsRepository;
use futures::stream::{self, StreamExt};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Outcome of one outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 2xx response.
    Success,
    /// Response with a non-2xx status.
    HttpError(u16),
    /// Connection, timeout or URL error.
    TransportError,
}

impl DispatchOutcome {
    fn is_success(self) -> bool {
        matches!(self, DispatchOutcome::Success)
    }

    fn label(self) -> &'static str {
        match self {
            DispatchOutcome::Success => "success",
            DispatchOutcome::HttpError(_) => "http_error",
            DispatchOutcome::TransportError => "transport_error",
        }
    }
}

/// Aggregate of a run. Never returned to the HTTP caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Client used to call cron targets (enables mocking).
#[async_trait::async_trait]
pub trait TargetClient: Send + Sync {
    /// GET `target`. Failures are reported, never raised.
    async fn get(&self, target: &str) -> DispatchOutcome;
}

/// reqwest-backed target client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTargetClient {
    client: reqwest::Client,
}

impl HttpTargetClient {
    /// Create a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, CronError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CronError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl TargetClient for HttpTargetClient {
    async fn get(&self, target: &str) -> DispatchOutcome {
        match self.client.get(target).send().await {
            Ok(response) if response.status().is_success() => DispatchOutcome::Success,
            Ok(response) => DispatchOutcome::HttpError(response.status().as_u16()),
            Err(e) => {
                debug!(
                    target: "cron.services.dispatcher",
                    error = %e,
                    timeout = e.is_timeout(),
                    "Target request failed"
                );
                DispatchOutcome::TransportError
            }
        }
    }
}

/// Call every target with at most `concurrency` calls in flight.
///
/// Completes only after all calls have settled. Completion order is
/// unspecified.
pub async fn dispatch_all(
    client: &dyn TargetClient,
    targets: Vec<String>,
    concurrency: usize,
) -> RunSummary {
    let dispatched = targets.len();

    let outcomes: Vec<DispatchOutcome> = stream::iter(targets)
        .map(|target| async move {
            let start = Instant::now();
            let outcome = client.get(target.trim()).await;
            record_dispatch(outcome.label(), start.elapsed());

            if !outcome.is_success() {
                debug!(
                    target: "cron.services.dispatcher",
                    cron = %target,
                    outcome = ?outcome,
                    "Cron target did not succeed"
                );
            }
            outcome
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();

    RunSummary {
        dispatched,
        succeeded,
        failed: dispatched - succeeded,
    }
}

/// Run every non-deleted cron. The status flag is not consulted.
///
/// # Errors
///
/// `NotFound("Crons not found!")` when no row is active; no call is made.
#[instrument(skip_all, fields(concurrency = concurrency))]
pub async fn run_active_crons(
    pool: &PgPool,
    client: &dyn TargetClient,
    concurrency: usize,
) -> Result<RunSummary, CronError> {
    let targets = CronsRepository::list_active_values(pool).await?;

    if targets.is_empty() {
        return Err(CronError::NotFound("Crons not found!".to_string()));
    }

    let start = Instant::now();
    let summary = dispatch_all(client, targets, concurrency).await;
    let elapsed = start.elapsed();

    record_run(summary.dispatched, summary.failed, elapsed);

    if summary.failed > 0 {
        warn!(
            target: "cron.services.dispatcher",
            dispatched = summary.dispatched,
            failed = summary.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cron run completed with failed targets"
        );
    } else {
        tracing::info!(
            target: "cron.services.dispatcher",
            dispatched = summary.dispatched,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cron run completed"
        );
    }

    Ok(summary)
}

/// Mock target client for testing.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Instrumented client: records calls and the peak number of calls in
    /// flight. Each call sleeps for `delay` before answering.
    pub struct MockTargetClient {
        delay: Duration,
        outcomes: HashMap<String, DispatchOutcome>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    impl MockTargetClient {
        /// Every call succeeds after `delay`.
        pub fn new(delay: Duration) -> Self {
            Self {
                delay,
                outcomes: HashMap::new(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Answer `target` with `outcome` instead of success.
        pub fn with_outcome(mut self, target: &str, outcome: DispatchOutcome) -> Self {
            self.outcomes.insert(target.to_string(), outcome);
            self
        }

        /// Highest number of concurrent calls observed.
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        /// Targets called so far, in start order.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl TargetClient for MockTargetClient {
        async fn get(&self, target: &str) -> DispatchOutcome {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(target.to_string());
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.outcomes
                .get(target)
                .copied()
                .unwrap_or(DispatchOutcome::Success)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::MockTargetClient;
    use super::*;

    fn targets(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://t{i}.example/ping")).collect()
    }

    #[tokio::test]
    async fn test_dispatch_respects_concurrency_bound() {
        let client = MockTargetClient::new(Duration::from_millis(20));

        let summary = dispatch_all(&client, targets(25), 4).await;

        assert_eq!(summary.dispatched, 25);
        assert_eq!(summary.succeeded, 25);
        assert_eq!(client.calls().len(), 25);
        assert!(client.max_in_flight() <= 4, "peak {}", client.max_in_flight());
        assert_eq!(client.max_in_flight(), 4);
    }

    #[tokio::test]
    async fn test_dispatch_fewer_targets_than_bound() {
        let client = MockTargetClient::new(Duration::from_millis(5));

        let summary = dispatch_all(&client, targets(3), 10).await;

        assert_eq!(summary.dispatched, 3);
        assert!(client.max_in_flight() <= 3);
    }

    #[tokio::test]
    async fn test_dispatch_counts_failures_without_erroring() {
        let client = MockTargetClient::new(Duration::from_millis(1))
            .with_outcome("https://t1.example/ping", DispatchOutcome::HttpError(500))
            .with_outcome("https://t2.example/ping", DispatchOutcome::TransportError);

        let summary = dispatch_all(&client, targets(4), 2).await;

        assert_eq!(
            summary,
            RunSummary {
                dispatched: 4,
                succeeded: 2,
                failed: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_trims_targets() {
        let client = MockTargetClient::new(Duration::ZERO);

        dispatch_all(&client, vec!["  https://a.example  ".to_string()], 1).await;

        assert_eq!(client.calls(), vec!["https://a.example".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_zero_concurrency_is_serial() {
        let client = MockTargetClient::new(Duration::from_millis(2));

        let summary = dispatch_all(&client, targets(3), 0).await;

        assert_eq!(summary.dispatched, 3);
        assert_eq!(client.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_http_client_reports_status() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fail"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpTargetClient::new(Duration::from_secs(5)).unwrap();

        assert_eq!(
            client.get(&format!("{}/ok", server.uri())).await,
            DispatchOutcome::Success
        );
        assert_eq!(
            client.get(&format!("{}/fail", server.uri())).await,
            DispatchOutcome::HttpError(503)
        );
        assert_eq!(
            client.get("not a url").await,
            DispatchOutcome::TransportError
        );
    }

    #[tokio::test]
    async fn test_http_client_times_out() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = HttpTargetClient::new(Duration::from_millis(100)).unwrap();

        assert_eq!(client.get(&server.uri()).await, DispatchOutcome::TransportError);
    }
}
