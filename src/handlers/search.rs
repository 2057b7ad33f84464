//! POI search HTTP handler.
//!
//! The one third-party-facing endpoint. Authentication is by API key
//! (`x-api-key` header) resolved through the cache-then-store path, so hot
//! keys cost no store read.

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::poi::PoiResult,
    services::key_store::hash_token,
    state::AppState,
    validation,
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub lat: Option<String>,
    pub lon: Option<String>,

    /// POI category; defaults to hospital
    #[serde(rename = "type", default = "default_type")]
    pub poi_type: String,

    /// Search radius in meters; defaults to 3000
    #[serde(default = "default_radius")]
    pub radius: String,
}

fn default_type() -> String {
    "hospital".to_string()
}

fn default_radius() -> String {
    "3000".to_string()
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<PoiResult>,
    pub count: usize,
}

/// `GET /search?lat&lon&type&radius`
///
/// # Flow
///
/// 1. Resolve the `x-api-key` header via cache, falling back to a store
///    lookup on miss (401 if no active key matches)
/// 2. Validate the search parameters (400 on any violation)
/// 3. Proxy the query to the geodata upstream (500 on upstream failure)
/// 4. Record usage against the key and return the results
///
/// The usage increment happens after a successful upstream call; if the
/// bookkeeping write fails the response still succeeds and the failure is
/// only logged.
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let api_key = headers
        .get("x-api-key")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidApiKey)?;

    let key_id = resolve_key(&state, api_key).await?;

    let request = validation::validate(
        params.lat.as_deref(),
        params.lon.as_deref(),
        &params.poi_type,
        &params.radius,
    )?;

    let results = state.poi.search(&request).await?;

    if let Err(e) = state.store.record_search_usage(key_id).await {
        tracing::error!(key_id = %key_id, "Failed to record key usage: {e}");
    }

    let count = results.len();
    Ok(Json(SearchResponse {
        success: true,
        results,
        count,
    }))
}

/// Resolve a raw API key to its store id, read-through the cache.
///
/// Cached entries are trusted for the cache TTL; within that window a
/// revoked key that escaped invalidation can still authenticate. That
/// bounded staleness is the documented cost of skipping a store read per
/// hot-key request.
async fn resolve_key(state: &AppState, api_key: &str) -> Result<Uuid, AppError> {
    let key_hash = hash_token(api_key);

    if let Some(key_id) = state.cache.get(&key_hash) {
        return Ok(key_id);
    }

    let record = state
        .store
        .find_active_by_hash(&key_hash)
        .await?
        .ok_or(AppError::InvalidApiKey)?;

    state.cache.put(&key_hash, record.id);

    Ok(record.id)
}
