//! API token claim types shared between the service and its test utilities.
//!
//! An API token is an HS256-signed JWT describing the fixed `APP` identity.
//! The signed token is never handed out as-is: callers receive (and send back
//! as a bearer credential) its encrypted form.
//!
//! # Security
//!
//! - Bearer values are size-checked BEFORE any decoding (DoS prevention)
//! - Error messages are generic to prevent information leakage
//! - The identity e-mail is redacted in Debug output

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum accepted size of a bearer credential in bytes (8KB).
///
/// Encrypted API tokens are roughly 4/3 the size of the signed JWT plus
/// 28 bytes of nonce and tag, well under this bound.
pub const MAX_API_TOKEN_SIZE_BYTES: usize = 8192;

/// Role carried by the trusted application identity.
pub const APP_ROLE: &str = "APP";

/// Subject id of the application identity (also stored as `created_by`).
pub const APP_USER_ID: i64 = 0;

// =============================================================================
// Error Types
// =============================================================================

/// Errors extracting a bearer credential from an `Authorization` header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BearerError {
    /// No `Authorization` header was sent.
    #[error("Missing Authorization header")]
    Missing,

    /// Header present but not of the form `Bearer <token>`.
    #[error("Invalid Authorization header format")]
    Malformed,

    /// Credential exceeds [`MAX_API_TOKEN_SIZE_BYTES`].
    #[error("The api token is invalid")]
    TooLarge,
}

// =============================================================================
// Claims Types
// =============================================================================

/// Identity record embedded in the token's `data` claim.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    pub user_id: i64,
    pub u_id: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl AppIdentity {
    /// The fixed application identity: subject 0, role `APP`.
    #[must_use]
    pub fn app(email_domain: &str) -> Self {
        Self {
            user_id: APP_USER_ID,
            u_id: APP_USER_ID.to_string(),
            email: format!("app@{email_domain}"),
            roles: vec![APP_ROLE.to_string()],
        }
    }

    /// Whether this identity carries the `APP` role.
    #[must_use]
    pub fn is_app(&self) -> bool {
        self.roles.iter().any(|r| r == APP_ROLE)
    }
}

impl fmt::Debug for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppIdentity")
            .field("user_id", &self.user_id)
            .field("u_id", &self.u_id)
            .field("email", &"[REDACTED]")
            .field("roles", &self.roles)
            .finish()
    }
}

/// Claims of a signed API token.
///
/// `exp` is omitted unless a token lifetime is configured; API tokens are
/// non-expiring by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
    pub data: Vec<AppIdentity>,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl AppClaims {
    /// Whether any embedded identity carries the `APP` role.
    #[must_use]
    pub fn has_app_role(&self) -> bool {
        self.data.iter().any(AppIdentity::is_app)
    }
}

// =============================================================================
// Bearer extraction
// =============================================================================

/// Extract the credential from an `Authorization: Bearer <token>` header value.
///
/// # Errors
///
/// Returns [`BearerError`] when the header is missing, not a bearer header,
/// empty, or larger than [`MAX_API_TOKEN_SIZE_BYTES`].
pub fn extract_bearer(header: Option<&str>) -> Result<&str, BearerError> {
    let header = header.ok_or(BearerError::Missing)?;

    if header.len() > MAX_API_TOKEN_SIZE_BYTES {
        return Err(BearerError::TooLarge);
    }

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(BearerError::Malformed)?
        .trim();

    if token.is_empty() {
        return Err(BearerError::Malformed);
    }

    Ok(token)
}
