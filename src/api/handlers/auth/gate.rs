//! Request authentication gate.
//!
//! Applied as middleware in front of every protected route: extract the
//! access token from transport, verify it, load the identity, and attach a
//! [`Principal`] to the request. Everything that fails here is a 401; a
//! deleted identity behind a still-valid token is indistinguishable from a
//! bad token.

use axum::{
    extract::{Extension, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::{state::AuthState, storage, tokens::TokenKind, transport};
use crate::api::error::ApiError;

/// Authenticated identity attached to the request, minus secret fields.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: uuid::Uuid,
    pub username: String,
    pub email: String,
}

/// Resolve the request's access token into a [`Principal`].
pub(crate) async fn authenticate(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<Principal, ApiError> {
    let Some(token) = transport::extract_access_token(headers) else {
        return Err(ApiError::Unauthorized("Missing access token".to_string()));
    };

    let claims = state
        .tokens()
        .verify(&token, TokenKind::Access)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired access token".to_string()))?;

    let user = storage::find_user(pool, claims.sub)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired access token".to_string()))?;

    Ok(Principal {
        user_id: user.id,
        username: user.username,
        email: user.email,
    })
}

/// Middleware wrapping every protected route.
pub async fn auth_gate(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = authenticate(request.headers(), &pool, &state).await?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
