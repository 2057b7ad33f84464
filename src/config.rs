//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `OVERPASS_URL` (optional): geodata interpreter endpoint
/// - `IDENTITY_TOKENINFO_URL` (optional): identity-provider token verification endpoint
/// - `KEY_CACHE_CAPACITY` (optional): max cached API keys, defaults to 1000
/// - `KEY_CACHE_TTL_SECS` (optional): cache entry lifetime, defaults to 300
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,

    #[serde(default = "default_tokeninfo_url")]
    pub identity_tokeninfo_url: String,

    #[serde(default = "default_cache_capacity")]
    pub key_cache_capacity: usize,

    #[serde(default = "default_cache_ttl_secs")]
    pub key_cache_ttl_secs: u64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_tokeninfo_url() -> String {
    "https://oauth2.googleapis.com/tokeninfo".to_string()
}

fn default_cache_capacity() -> usize {
    1000
}

/// 5 minutes. Bounds how long a revoked key can keep authenticating
/// through the cache in the worst case.
fn default_cache_ttl_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }
}
