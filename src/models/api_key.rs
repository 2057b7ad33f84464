//! API key data models and response types.
//!
//! Keys authenticate third-party search callers. The raw token is handed to
//! the owner exactly once, at creation; only its SHA-256 hash is persisted,
//! so no response type here can ever carry key material.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// An issued API key record from the database.
///
/// # Lifecycle
///
/// `nonexistent -> active -> revoked`. Revocation is terminal: `active`
/// never returns to true, and rows are never deleted by this service.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    /// Store-assigned identifier
    pub id: Uuid,

    /// Identity-provider subject of the owning user
    pub owner_id: String,

    /// SHA-256 hex digest of the raw key token (64 characters)
    pub key_hash: String,

    /// Display label, user-supplied or generated at creation
    pub name: String,

    /// Whether this key is accepted for authentication
    pub active: bool,

    /// Timestamp when this key was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of the most recent successful verify, if any
    pub last_used: Option<DateTime<Utc>>,

    /// Number of successful searches made with this key.
    ///
    /// Only ever increases; incremented atomically in the store so
    /// concurrent searches never lose updates.
    pub usage_count: i64,
}

/// Key representation returned by the usage endpoint.
///
/// Excludes `key_hash`: once issued, key material (or anything derived from
/// it) is never exposed again.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: i64,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            active: key.active,
            created_at: key.created_at,
            last_used: key.last_used,
            usage_count: key.usage_count,
        }
    }
}
