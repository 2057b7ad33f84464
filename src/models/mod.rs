//! Data models for database entities and upstream payloads.

/// API key credential model
pub mod api_key;
/// Geodata element shapes and the normalized POI record
pub mod poi;
