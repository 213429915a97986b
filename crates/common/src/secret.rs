//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for the JWT signing secret, the
//! token encryption key and the database URL. Anything wrapped in these types
//! prints as `[REDACTED]` through `{:?}` and `tracing`, and is zeroized on
//! drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct SigningSettings {
//!     issuer: String,
//!     secret: SecretString,
//! }
//!
//! let settings = SigningSettings {
//!     issuer: "cron-api".to_string(),
//!     secret: SecretString::from("hmac-secret"),
//! };
//!
//! assert!(!format!("{settings:?}").contains("hmac-secret"));
//! assert_eq!(settings.secret.expose_secret(), "hmac-secret");
//! ```
//!
//! Use `SecretString` for the signing secret and connection URLs, and
//! `SecretBox<Vec<u8>>` for raw key material such as the 32-byte token
//! encryption key.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
