//! Shared application state.

use std::sync::Arc;

use crate::{
    cache::KeyCache,
    services::{identity::IdentityVerifier, key_store::KeyStore, poi_client::PoiClient},
};

/// State shared by all handlers via axum's `State` extractor.
///
/// Everything here is either immutable or internally synchronized; the key
/// cache is the only mutable structure and carries its own lock. The store
/// and verifier sit behind trait objects so tests can inject in-memory
/// implementations.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyStore>,
    pub cache: Arc<KeyCache>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub poi: PoiClient,
}
