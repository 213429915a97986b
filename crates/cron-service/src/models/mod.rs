//! Data models for the cron service.
//!
//! Database rows, the response envelope, and request payloads
//! (see [`requests`]).

pub mod requests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use requests::{
    parse_cron_id, BatchDeleteRequest, BatchUpdate, BatchUpdateRequest, CreateCronRequest,
    CronUpdate, DeleteCronRequest, GetCronQuery, ListCronsQuery, ListFilter, UpdateCronRequest,
};

/// Uniform JSON envelope: `{"error": bool, "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub error: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Successful envelope wrapping `data`.
    pub fn success(data: T) -> Self {
        Self { error: false, data }
    }
}

impl ApiResponse<String> {
    /// Error envelope carrying a client-facing message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            data: message.into(),
        }
    }

    /// Successful envelope carrying a confirmation message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::success(message.into())
    }
}

/// A stored cron target.
///
/// `cron` is a URL-like string fetched by `GET /run`; it is stored trimmed
/// and lower-cased. A non-null `deleted_at` marks a soft-deleted row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct CronEntry {
    pub cron_id: i64,
    pub cron: String,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CronEntry {
    /// Whether the row is soft-deleted.
    pub fn is_soft_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A stored, encrypted API token.
#[derive(Clone, sqlx::FromRow)]
pub struct ApiToken {
    pub id: i64,
    pub apitoken: String,
    pub status: i16,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Custom Debug implementation that redacts the ciphertext.
impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiToken")
            .field("id", &self.id)
            .field("apitoken", &"[REDACTED]")
            .field("status", &self.status)
            .field("created_by", &self.created_by)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("deleted_at", &self.deleted_at)
            .finish()
    }
}

/// How an update touches `deleted_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletedAtAction {
    /// `deleted_at = 0`: clear the soft-delete marker.
    Restore,
    /// `deleted_at = 1`: soft-delete now.
    SoftDelete,
}

impl DeletedAtAction {
    /// Map the wire flag (0 or 1) to an action.
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(DeletedAtAction::Restore),
            1 => Some(DeletedAtAction::SoftDelete),
            _ => None,
        }
    }
}

/// Echo payload returned by the diagnostic endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoResponse {
    pub error: bool,
    pub body: serde_json::Value,
    pub query: serde_json::Value,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status ("healthy" or "unhealthy").
    pub status: String,

    /// Database connectivity status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}
