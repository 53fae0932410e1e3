//! Session endpoints: current identity, refresh rotation, and logout.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{
    gate::Principal,
    state::AuthState,
    storage,
    tokens::{fingerprint, TokenKind},
    transport,
    types::{MessageResponse, RefreshRequest, TokenPairResponse, UserResponse},
};
use crate::api::error::ApiError;

/// Freshly minted token pair.
pub(super) struct SessionTokens {
    pub(super) access_token: String,
    pub(super) refresh_token: String,
}

/// Issue a token pair and pin the refresh fingerprint on the user row.
///
/// Overwriting the fingerprint is what enforces the single-active-session
/// rule: any previously issued refresh token stops matching.
pub(super) async fn establish_session(
    pool: &PgPool,
    state: &AuthState,
    user_id: Uuid,
) -> Result<SessionTokens, ApiError> {
    let access_token = state
        .tokens()
        .issue(TokenKind::Access, user_id)
        .map_err(|err| ApiError::Internal(err.into()))?;
    let refresh_token = state
        .tokens()
        .issue(TokenKind::Refresh, user_id)
        .map_err(|err| ApiError::Internal(err.into()))?;

    storage::store_refresh_fingerprint(pool, user_id, &fingerprint(&refresh_token))
        .await
        .map_err(ApiError::Internal)?;

    Ok(SessionTokens {
        access_token,
        refresh_token,
    })
}

pub(super) fn session_cookie_headers(
    state: &AuthState,
    tokens: &SessionTokens,
) -> Result<HeaderMap, ApiError> {
    let cookies = transport::session_cookies(
        state.config(),
        &tokens.access_token,
        &tokens.refresh_token,
    )
    .map_err(|err| ApiError::Internal(err.into()))?;

    let mut headers = HeaderMap::new();
    transport::apply_cookies(&mut headers, cookies);
    Ok(headers)
}

#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "Authenticated identity", body = UserResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "users"
)]
pub async fn me(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = storage::find_user(&pool, principal.user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired access token".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    post,
    path = "/v1/users/logout",
    responses(
        (status = 200, description = "Session cleared, cookies expired", body = MessageResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "users"
)]
pub async fn logout(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    storage::clear_refresh_fingerprint(&pool, principal.user_id)
        .await
        .map_err(ApiError::Internal)?;

    // Always clear the cookies, even if no session fingerprint was stored.
    let cookies = transport::clear_session_cookies(state.config())
        .map_err(|err| ApiError::Internal(err.into()))?;
    let mut headers = HeaderMap::new();
    transport::apply_cookies(&mut headers, cookies);

    debug!(user_id = %principal.user_id, "session cleared");

    Ok((
        StatusCode::OK,
        headers,
        Json(MessageResponse::new("User logged out")),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/users/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued", body = TokenPairResponse),
        (status = 401, description = "Missing, invalid or superseded refresh token")
    ),
    tag = "users"
)]
pub async fn refresh(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    // Cookie first, body field as fallback transport.
    let presented = transport::extract_refresh_cookie(&headers)
        .or_else(|| {
            body.and_then(|Json(body)| body.refresh_token)
                .filter(|token| !token.trim().is_empty())
        })
        .ok_or_else(|| ApiError::Unauthorized("Missing refresh token".to_string()))?;

    let claims = state
        .tokens()
        .verify(&presented, TokenKind::Refresh)
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    let stored = storage::stored_fingerprint(&pool, claims.sub)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    if !fingerprint_matches(stored.as_deref(), &fingerprint(&presented)) {
        // A signed-but-unpinned token was rotated out, reused, or revoked.
        return Err(ApiError::Unauthorized(
            "Refresh token is expired or used".to_string(),
        ));
    }

    let tokens = establish_session(&pool, &state, claims.sub).await?;
    let response_headers = session_cookie_headers(&state, &tokens)?;

    Ok((
        StatusCode::OK,
        response_headers,
        Json(TokenPairResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    ))
}

/// Compare the presented fingerprint to the pinned one. A cleared
/// fingerprint (logged out) never matches.
fn fingerprint_matches(stored: Option<&str>, presented: &str) -> bool {
    stored.is_some_and(|stored| stored == presented)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn fingerprint_match_requires_pinned_value() {
        assert!(!fingerprint_matches(None, "abc"));
        assert!(!fingerprint_matches(Some("other"), "abc"));
        assert!(fingerprint_matches(Some("abc"), "abc"));
    }

    #[test]
    fn session_cookie_headers_set_both_cookies() {
        let state = AuthState::new(super::super::state::AuthConfig::new(
            SecretString::from("access-secret"),
            SecretString::from("refresh-secret"),
        ));
        let tokens = SessionTokens {
            access_token: "acc".to_string(),
            refresh_token: "ref".to_string(),
        };

        let headers = session_cookie_headers(&state, &tokens).expect("cookie headers");
        assert_eq!(
            headers
                .get_all(axum::http::header::SET_COOKIE)
                .iter()
                .count(),
            2
        );
    }
}
