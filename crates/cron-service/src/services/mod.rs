//! Service layer for the cron service.
//!
//! - `token_issuer` - API token minting and storage
//! - `dispatcher` - bounded fan-out of `GET /run`

pub mod dispatcher;
pub mod token_issuer;

pub use dispatcher::{
    mock::MockTargetClient, DispatchOutcome, HttpTargetClient, RunSummary, TargetClient,
};
