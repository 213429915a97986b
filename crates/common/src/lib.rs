//! Common utilities and types shared across the cron API crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for API token claim types and bearer-header parsing
pub mod jwt;
