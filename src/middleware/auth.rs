//! Identity bearer-token authentication middleware.
//!
//! Key management endpoints (generateKey, revokeKey, usage) are owner
//! actions: the caller proves who they are with an identity-provider token,
//! and every store operation downstream is scoped to that owner. This
//! middleware:
//! 1. Extracts the `Authorization: Bearer <idToken>` header
//! 2. Verifies the token against the identity provider
//! 3. Injects the resolved owner id into the request
//! 4. Rejects unauthorized requests with HTTP 401

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState};

/// Authentication context attached to authenticated requests.
///
/// Handlers extract this with `Extension<AuthContext>` to scope store
/// queries to the caller's keys.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Identity-provider subject of the caller
    pub owner_id: String,
}

/// Bearer-token authentication middleware function.
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer <idToken>
/// ```
///
/// # Returns
///
/// - `Ok(Response)` if the token verifies (calls the next handler)
/// - `Err(AppError::Unauthorized)` otherwise (returns 401)
pub async fn identity_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    // Every failure mode collapses to 401; detail stays in the logs.
    let owner_id = state.identity.verify(token).await?;

    request.extensions_mut().insert(AuthContext { owner_id });

    Ok(next.run(request).await)
}
