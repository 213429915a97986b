//! # Cron Test Utilities
//!
//! Shared test utilities for the cron service:
//! - Deterministic fixtures (fixed JWT secret and encryption key)
//! - `TestCronServer`, a real server on a random port backed by the
//!   `#[sqlx::test]` pool
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cron_test_utils::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_example(pool: PgPool) -> anyhow::Result<()> {
//!     let server = TestCronServer::spawn(pool).await?;
//!     let token = server.issue_api_token().await?;
//!
//!     let response = server
//!         .client()
//!         .get(format!("{}/crons", server.url()))
//!         .bearer_auth(&token)
//!         .send()
//!         .await?;
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod server_harness;

pub use fixtures::*;
pub use server_harness::*;
