//! Identity bearer-token verification.
//!
//! The dashboard authenticates users against an external identity provider;
//! this service only needs to turn an opaque bearer token into the subject
//! id that owns API keys. Verification goes through the provider's
//! tokeninfo endpoint, kept behind a trait so tests can use a static map.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::AppError;

/// Verifies identity bearer tokens.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolve a bearer token to the identity-provider subject it proves.
    ///
    /// Any failure (network, non-success status, missing subject) maps to
    /// `AppError::Unauthorized`; the caller never learns why.
    async fn verify(&self, token: &str) -> Result<String, AppError>;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: String,
}

/// Tokeninfo-endpoint verifier.
///
/// Sends the token to the configured HTTPS endpoint and reads the `sub`
/// claim from the response.
pub struct HttpIdentityVerifier {
    http: reqwest::Client,
    tokeninfo_url: String,
}

impl HttpIdentityVerifier {
    pub fn new(tokeninfo_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("HTTP client configuration is valid");

        Self {
            http,
            tokeninfo_url,
        }
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<String, AppError> {
        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Identity provider unreachable: {e}");
                AppError::Unauthorized
            })?;

        if !response.status().is_success() {
            return Err(AppError::Unauthorized);
        }

        let info: TokenInfo = response.json().await.map_err(|e| {
            tracing::warn!("Malformed tokeninfo response: {e}");
            AppError::Unauthorized
        })?;

        Ok(info.sub)
    }
}

/// Static verifier for tests: maps fixed tokens to subjects.
#[cfg(test)]
pub struct StaticIdentityVerifier {
    subjects: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl StaticIdentityVerifier {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            subjects: pairs
                .iter()
                .map(|(token, sub)| (token.to_string(), sub.to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<String, AppError> {
        self.subjects
            .get(token)
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
