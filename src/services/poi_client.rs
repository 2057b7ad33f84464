//! Proxy client for the Overpass geodata interpreter.
//!
//! Translates a validated [`SearchRequest`] into an Overpass QL query,
//! issues it, and normalizes the heterogeneous element shapes into
//! [`PoiResult`] records.
//!
//! # Injection safety
//!
//! The query is assembled exclusively from a [`SearchRequest`], which only
//! the validator can construct: the category interpolates as an enum's
//! `&'static str` token and the remaining fields are numbers. No raw user
//! string can reach [`build_query`].

use std::time::Duration;

use crate::{
    error::AppError,
    models::poi::{OverpassResponse, PoiResult},
    validation::SearchRequest,
};

/// Results are truncated to this many entries, preserving upstream order.
const MAX_RESULTS: usize = 50;

/// Transport-level timeout for the upstream call.
const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// In-query timeout hint; the upstream self-aborts before our transport
/// timeout fires, so we get a parseable error instead of a dead socket.
const QUERY_TIMEOUT_SECS: u32 = 25;

/// Build the Overpass QL query for a validated request.
///
/// Selects all three geometry kinds filtered by amenity and radius, with
/// `out center` so ways and relations carry centroid coordinates.
fn build_query(req: &SearchRequest) -> String {
    let amenity = req.category.as_str();
    let SearchRequest {
        lat, lon, radius_m, ..
    } = req;

    format!(
        "[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n\
         (\n\
         \x20 node[\"amenity\"=\"{amenity}\"](around:{radius_m},{lat},{lon});\n\
         \x20 way[\"amenity\"=\"{amenity}\"](around:{radius_m},{lat},{lon});\n\
         \x20 relation[\"amenity\"=\"{amenity}\"](around:{radius_m},{lat},{lon});\n\
         );\n\
         out center;"
    )
}

/// HTTP client for the geodata upstream.
#[derive(Clone)]
pub struct PoiClient {
    http: reqwest::Client,
    endpoint: String,
}

impl PoiClient {
    pub fn new(endpoint: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(TRANSPORT_TIMEOUT)
            .build()
            .expect("HTTP client configuration is valid");

        Self { http, endpoint }
    }

    /// Execute a POI search against the upstream interpreter.
    ///
    /// # Process
    ///
    /// 1. Build the query from the validated request
    /// 2. POST it form-encoded as `data=<query>`
    /// 3. Drop elements without a usable coordinate
    /// 4. Normalize the rest to [`PoiResult`], truncated to 50
    ///
    /// An empty result set is not an error. Timeouts and non-success
    /// statuses map to `AppError::Upstream` (a 500 to the caller); there
    /// are no retries.
    pub async fn search(&self, req: &SearchRequest) -> Result<Vec<PoiResult>, AppError> {
        let query = build_query(req);

        let response = self
            .http
            .post(&self.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let body: OverpassResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed response: {e}")))?;

        let results = body
            .elements
            .iter()
            .filter_map(|element| PoiResult::from_element(element, req.category))
            .take(MAX_RESULTS)
            .collect();

        Ok(results)
    }
}
