//! Key lifecycle HTTP handlers.
//!
//! - `GET /verify` - check a key without consuming search quota
//! - `POST /generateKey` - mint a new key for the authenticated owner
//! - `POST /revokeKey` - permanently deactivate an owned key
//! - `GET /usage` - list owned keys with usage aggregates

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::api_key::ApiKeyResponse,
    services::key_store::hash_token,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub key: Option<String>,
}

/// `GET /verify?key=<value>`
///
/// SDK-facing validity check. Always queries the store directly, bypassing
/// the cache, so a freshly revoked key reads as invalid immediately. On a
/// valid key, stamps `last_used`.
///
/// Every response carries a `valid` boolean, including error paths, so
/// callers can branch on that one field.
pub async fn verify(State(state): State<AppState>, Query(params): Query<VerifyParams>) -> Response {
    let Some(key) = params.key else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "valid": false, "error": "API key is required" })),
        )
            .into_response();
    };

    let lookup = state.store.find_active_by_hash(&hash_token(&key)).await;

    match lookup {
        Ok(Some(record)) => {
            if let Err(e) = state.store.touch_last_used(record.id).await {
                tracing::error!("Failed to stamp last_used: {e}");
                return internal_verify_error();
            }
            (StatusCode::OK, Json(json!({ "valid": true }))).into_response()
        }
        Ok(None) => (StatusCode::OK, Json(json!({ "valid": false }))).into_response(),
        Err(e) => {
            tracing::error!("Key verification failed: {e}");
            internal_verify_error()
        }
    }
}

fn internal_verify_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "valid": false, "error": "Internal server error" })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct GenerateKeyRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateKeyResponse {
    pub success: bool,
    pub key_id: Uuid,
    /// Raw key material. Shown exactly once; only its hash is stored.
    pub key: String,
}

/// `POST /generateKey`
///
/// # Authentication
///
/// Identity bearer token (see [`crate::middleware::auth`]).
///
/// # Request Body
///
/// ```json
/// { "name": "My integration" }
/// ```
///
/// Body and name are both optional; an omitted name gets a generated label.
pub async fn generate_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Option<Json<GenerateKeyRequest>>,
) -> Result<Json<GenerateKeyResponse>, AppError> {
    let name = body
        .and_then(|Json(req)| req.name)
        .unwrap_or_else(|| format!("API Key {}", Utc::now().timestamp_millis()));

    let (record, token) = state.store.create(&auth.owner_id, &name).await?;

    tracing::info!(owner = %auth.owner_id, key_id = %record.id, "API key created");

    Ok(Json(GenerateKeyResponse {
        success: true,
        key_id: record.id,
        key: token,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeKeyRequest {
    pub key_id: Option<String>,
}

/// `POST /revokeKey`
///
/// Deactivates a key. Ownership is enforced by scoping the store update to
/// `(owner, keyId)`; a key id belonging to someone else is indistinguishable
/// from a nonexistent one. Revocation is terminal, and a second call on the
/// same key returns 404 with `active` still false.
///
/// Also drops the key's cache entry so in-flight search traffic stops
/// authenticating ahead of the TTL.
pub async fn revoke_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Option<Json<RevokeKeyRequest>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let key_id = body
        .and_then(|Json(req)| req.key_id)
        .ok_or(AppError::MissingKeyId)?;

    // A malformed id can't name an owned key.
    let key_id: Uuid = key_id.parse().map_err(|_| AppError::KeyNotFound)?;

    state.store.deactivate(&auth.owner_id, key_id).await?;
    state.cache.invalidate_id(key_id);

    tracing::info!(owner = %auth.owner_id, key_id = %key_id, "API key revoked");

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub success: bool,
    pub keys: Vec<ApiKeyResponse>,
    pub total_usage: i64,
    pub active_keys: usize,
}

/// `GET /usage`
///
/// Lists every key the caller owns (active and revoked) with aggregate
/// totals. Key hashes are not included; raw material was only ever shown
/// at creation.
pub async fn usage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UsageResponse>, AppError> {
    let keys = state.store.list_by_owner(&auth.owner_id).await?;

    let total_usage = keys.iter().map(|k| k.usage_count).sum();
    let active_keys = keys.iter().filter(|k| k.active).count();

    Ok(Json(UsageResponse {
        success: true,
        keys: keys.into_iter().map(Into::into).collect(),
        total_usage,
        active_keys,
    }))
}
