//! Cron service library.
//!
//! A CRUD registry of cron targets (URL-like strings), a `GET /run`
//! dispatcher that calls every active target with bounded concurrency, and
//! an encrypted API token scheme guarding the registry.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `crypto` - Token cipher and HS256 signing
//! - `errors` - Error taxonomy and the `{error, data}` envelope
//! - `handlers` - HTTP request handlers
//! - `middleware` - API token gate and HTTP metrics
//! - `models` - Rows, envelope and request validation
//! - `observability` - Prometheus metrics
//! - `repositories` - PostgreSQL access
//! - `routes` - Axum router and application state
//! - `services` - Token issuance and the execution dispatcher

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
