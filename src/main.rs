//! POI Gateway - Main Application Entry Point
//!
//! HTTP API that lets registered users generate revocable API keys and lets
//! third parties use those keys to search nearby points of interest through
//! a proxied geodata backend.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Key Store**: PostgreSQL with sqlx (async queries) behind a trait
//! - **Authentication**: identity bearer tokens for key management,
//!   SHA-256-hashed API keys (with a bounded TTL cache) for search
//! - **Upstream**: Overpass-style geodata interpreter over reqwest
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Assemble shared state (store, key cache, identity verifier, POI client)
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod cache;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;
mod validation;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use crate::{
    cache::KeyCache,
    error::AppError,
    services::{identity::HttpIdentityVerifier, key_store::PgKeyStore, poi_client::PoiClient},
    state::AppState,
};

/// Wrong-method fallback: every endpoint answers 405 as JSON.
async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Build the application router.
///
/// Key management endpoints (generateKey, revokeKey, usage) sit behind the
/// identity bearer-token middleware; verify and search carry their own
/// credentials. CORS is wide open: this is a public API surface consumed
/// from browser SDKs on arbitrary origins.
fn app(state: AppState) -> Router {
    // Owner actions, authenticated by identity bearer token
    let owner_routes = Router::new()
        .route(
            "/generateKey",
            post(handlers::keys::generate_key).fallback(method_not_allowed),
        )
        .route(
            "/revokeKey",
            post(handlers::keys::revoke_key).fallback(method_not_allowed),
        )
        .route(
            "/usage",
            get(handlers::keys::usage).fallback(method_not_allowed),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::identity_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/verify",
            get(handlers::keys::verify).fallback(method_not_allowed),
        )
        .route(
            "/search",
            get(handlers::search::search).fallback(method_not_allowed),
        )
        .merge(owner_routes)
        // Distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Assemble shared state. The cache is constructed here and injected, so
    // handlers never touch hidden global state.
    let state = AppState {
        store: Arc::new(PgKeyStore::new(pool)),
        cache: Arc::new(KeyCache::new(
            config.key_cache_capacity,
            Duration::from_secs(config.key_cache_ttl_secs),
        )),
        identity: Arc::new(HttpIdentityVerifier::new(
            config.identity_tokeninfo_url.clone(),
        )),
        poi: PoiClient::new(config.overpass_url.clone()),
    };

    let app = app(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        identity::StaticIdentityVerifier,
        key_store::{InMemoryKeyStore, KeyStore},
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::post as post_route,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    const BEARER: &str = "Bearer alice-token";

    /// Serve a fixed Overpass-style JSON body on an ephemeral port.
    async fn spawn_upstream(body: Value) -> String {
        let stub = Router::new().route(
            "/",
            post_route(move || {
                let body = body.clone();
                async move { axum::Json(body) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });

        format!("http://{addr}/")
    }

    fn three_hospitals() -> Value {
        json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 40.71, "lon": -74.0,
                 "tags": {"name": "Bellevue"}},
                {"type": "way", "id": 2, "center": {"lat": 40.72, "lon": -74.01}},
                {"type": "relation", "id": 3, "center": {"lat": 40.73, "lon": -74.02}}
            ]
        })
    }

    struct TestApp {
        app: Router,
        store: Arc<InMemoryKeyStore>,
    }

    async fn test_app(upstream_body: Value) -> TestApp {
        let upstream = spawn_upstream(upstream_body).await;
        let store = Arc::new(InMemoryKeyStore::new());
        let state = AppState {
            store: store.clone(),
            cache: Arc::new(KeyCache::new(1000, Duration::from_secs(300))),
            identity: Arc::new(StaticIdentityVerifier::new(&[("alice-token", "alice")])),
            poi: PoiClient::new(upstream),
        };
        TestApp {
            app: app(state),
            store,
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn generate_key(app: &Router) -> (Uuid, String) {
        let request = Request::builder()
            .method("POST")
            .uri("/generateKey")
            .header("Authorization", BEARER)
            .header("Content-Type", "application/json")
            .body(Body::from(json!({"name": "test key"}).to_string()))
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));

        let key_id = body["keyId"].as_str().unwrap().parse().unwrap();
        (key_id, body["key"].as_str().unwrap().to_string())
    }

    async fn revoke_key(app: &Router, key_id: Uuid) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/revokeKey")
            .header("Authorization", BEARER)
            .header("Content-Type", "application/json")
            .body(Body::from(json!({"keyId": key_id}).to_string()))
            .unwrap();
        send(app, request).await
    }

    #[tokio::test]
    async fn generated_key_verifies_as_valid() {
        let t = test_app(three_hospitals()).await;
        let (_, key) = generate_key(&t.app).await;

        let (status, body) = send(&t.app, get_req(&format!("/verify?key={key}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"valid": true}));
    }

    #[tokio::test]
    async fn unknown_key_verifies_as_invalid() {
        let t = test_app(three_hospitals()).await;
        let (status, body) = send(&t.app, get_req("/verify?key=not-a-real-key")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"valid": false}));
    }

    #[tokio::test]
    async fn verify_without_key_is_400_with_valid_false() {
        let t = test_app(three_hospitals()).await;
        let (status, body) = send(&t.app, get_req("/verify")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["valid"], json!(false));
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn revoked_key_verifies_as_invalid() {
        let t = test_app(three_hospitals()).await;
        let (key_id, key) = generate_key(&t.app).await;

        let (status, body) = revoke_key(&t.app, key_id).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (status, body) = send(&t.app, get_req(&format!("/verify?key={key}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"valid": false}));
    }

    #[tokio::test]
    async fn double_revoke_is_not_found_and_stays_inactive() {
        let t = test_app(three_hospitals()).await;
        let (key_id, _) = generate_key(&t.app).await;

        let (status, _) = revoke_key(&t.app, key_id).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = revoke_key(&t.app, key_id).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let keys = t.store.list_by_owner("alice").await.unwrap();
        assert!(!keys[0].active);
    }

    #[tokio::test]
    async fn revoke_without_key_id_is_400() {
        let t = test_app(three_hospitals()).await;
        let request = Request::builder()
            .method("POST")
            .uri("/revokeKey")
            .header("Authorization", BEARER)
            .header("Content-Type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn key_management_requires_bearer_token() {
        let t = test_app(three_hospitals()).await;

        let request = Request::builder()
            .method("POST")
            .uri("/generateKey")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .method("POST")
            .uri("/generateKey")
            .header("Authorization", "Bearer forged")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_method_is_405_json() {
        let t = test_app(three_hospitals()).await;
        let request = Request::builder()
            .method("POST")
            .uri("/verify")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({"error": "Method not allowed"}));
    }

    #[tokio::test]
    async fn search_end_to_end_applies_category_defaults() {
        let t = test_app(three_hospitals()).await;
        let (key_id, key) = generate_key(&t.app).await;

        let request = Request::builder()
            .uri("/search?lat=40.7128&lon=-74.0060&type=hospital&radius=3000")
            .header("x-api-key", &key)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&t.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["count"], json!(3));
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["name"], json!("Bellevue"));
        // Untagged elements fall back to the requested category.
        assert_eq!(results[1]["name"], json!("Hospital"));
        assert_eq!(results[1]["category"], json!("hospital"));

        assert_eq!(t.store.usage_count(key_id), 1);
    }

    #[tokio::test]
    async fn search_without_key_is_401() {
        let t = test_app(three_hospitals()).await;
        let (status, body) =
            send(&t.app, get_req("/search?lat=40.7&lon=-74.0&type=hospital")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn search_with_revoked_key_is_401() {
        let t = test_app(three_hospitals()).await;
        let (key_id, key) = generate_key(&t.app).await;

        // Warm the cache with a successful search.
        let request = Request::builder()
            .uri("/search?lat=40.7&lon=-74.0&type=hospital&radius=3000")
            .header("x-api-key", &key)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::OK);

        // Revoking drops the cache entry, so the next search cannot ride
        // the TTL window.
        revoke_key(&t.app, key_id).await;

        let request = Request::builder()
            .uri("/search?lat=40.7&lon=-74.0&type=hospital&radius=3000")
            .header("x-api-key", &key)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn search_rejects_invalid_parameters() {
        let t = test_app(three_hospitals()).await;
        let (_, key) = generate_key(&t.app).await;

        for uri in [
            "/search?lat=91&lon=0&type=hospital&radius=3000",
            "/search?lat=40.7&lon=-74.0&type=%3Cscript%3E&radius=3000",
            "/search?lat=40.7&lon=-74.0&type=hospital&radius=50",
            "/search?lon=-74.0&type=hospital&radius=3000",
        ] {
            let request = Request::builder()
                .uri(uri)
                .header("x-api-key", &key)
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(&t.app, request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "uri: {uri}");
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn concurrent_searches_lose_no_usage_increments() {
        let t = test_app(three_hospitals()).await;
        let (key_id, key) = generate_key(&t.app).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let app = t.app.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                let request = Request::builder()
                    .uri("/search?lat=40.7&lon=-74.0&type=hospital&radius=3000")
                    .header("x-api-key", &key)
                    .body(Body::empty())
                    .unwrap();
                let response = app.oneshot(request).await.unwrap();
                assert_eq!(response.status(), StatusCode::OK);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(t.store.usage_count(key_id), 20);
    }

    #[tokio::test]
    async fn usage_reports_totals_and_active_count() {
        let t = test_app(three_hospitals()).await;
        let (key_id, key) = generate_key(&t.app).await;
        let (revoked_id, _) = generate_key(&t.app).await;
        revoke_key(&t.app, revoked_id).await;

        let request = Request::builder()
            .uri("/search?lat=40.7&lon=-74.0&type=hospital&radius=3000")
            .header("x-api-key", &key)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::builder()
            .uri("/usage")
            .header("Authorization", BEARER)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&t.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["totalUsage"], json!(1));
        assert_eq!(body["activeKeys"], json!(1));
        let keys = body["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 2);
        // Raw key material and hashes never appear in usage listings.
        for key in keys {
            assert!(key.get("key").is_none());
            assert!(key.get("keyHash").is_none());
        }
        assert!(
            keys.iter()
                .any(|k| k["id"] == json!(key_id) && k["usageCount"] == json!(1))
        );
    }

    #[tokio::test]
    async fn health_reports_store_connectivity() {
        let t = test_app(three_hospitals()).await;
        let (status, body) = send(&t.app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
        assert_eq!(body["store"], json!("connected"));
    }
}
