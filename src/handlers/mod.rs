//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic (store queries, validation, proxying)
//! 3. Returns HTTP response (JSON, status code)

/// Service health endpoint
pub mod health;
/// Key lifecycle endpoints: verify, generateKey, revokeKey, usage
pub mod keys;
/// POI search endpoint
pub mod search;
