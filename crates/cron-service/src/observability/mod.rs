//! Observability for the cron service.
//!
//! Instrumentation uses `#[instrument(skip_all)]` or explicit skips so API
//! tokens, ciphertexts and secrets never become span fields. Target URLs are
//! logged at debug level only and never used as metric labels.

pub mod metrics;
