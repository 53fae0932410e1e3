//! Login with username or email plus password.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::{
    password::verify_password,
    session::{establish_session, session_cookie_headers},
    state::AuthState,
    storage,
    types::{LoginRequest, LoginResponse, UserResponse},
    utils::{normalize_identifier, valid_email, validate_password},
};
use crate::api::error::ApiError;

/// Unknown identity and wrong password are deliberately indistinguishable,
/// so login cannot be used to probe which accounts exist.
fn credential_failure() -> ApiError {
    ApiError::Unauthorized("Invalid user credentials".to_string())
}

struct LoginIdentifier {
    username: Option<String>,
    email: Option<String>,
}

fn validate_login(request: &LoginRequest) -> Result<LoginIdentifier, ApiError> {
    let username = request
        .username
        .as_deref()
        .map(normalize_identifier)
        .filter(|value| !value.is_empty());
    let email = request
        .email
        .as_deref()
        .map(normalize_identifier)
        .filter(|value| !value.is_empty());

    if username.is_none() && email.is_none() {
        return Err(ApiError::InvalidInput(
            "Username or email is required".to_string(),
        ));
    }

    validate_password(&request.password)?;

    if let Some(email) = &email {
        if !valid_email(email) {
            return Err(ApiError::InvalidInput("Invalid email format".to_string()));
        }
    }

    Ok(LoginIdentifier { username, email })
}

#[utoipa::path(
    post,
    path = "/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, cookies set", body = LoginResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "users"
)]
pub async fn login(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) =
        body.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;
    let identifier = validate_login(&request)?;

    let record = storage::find_login_record(
        &pool,
        identifier.username.as_deref(),
        identifier.email.as_deref(),
    )
    .await
    .map_err(ApiError::Internal)?
    .ok_or_else(credential_failure)?;

    let verified = verify_password(&request.password, &record.password_hash)
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("password verification failed: {err}")))?;
    if !verified {
        return Err(credential_failure());
    }

    info!(user_id = %record.user.id, "user logged in");

    // Establishing the session rotates the fingerprint, invalidating any
    // session this identity held before.
    let tokens = establish_session(&pool, &state, record.user.id).await?;
    let headers = session_cookie_headers(&state, &tokens)?;

    Ok((
        StatusCode::OK,
        headers,
        Json(LoginResponse {
            user: UserResponse::from(record.user),
            access_token: tokens.access_token,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: Option<&str>, email: Option<&str>, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            password: password.to_string(),
        }
    }

    #[test]
    fn validate_login_requires_an_identifier() {
        assert!(matches!(
            validate_login(&request(None, None, "secret1")),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_login(&request(Some("  "), None, "secret1")),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn validate_login_accepts_either_identifier() {
        let by_username =
            validate_login(&request(Some("Alice"), None, "secret1")).expect("valid login");
        assert_eq!(by_username.username.as_deref(), Some("alice"));
        assert!(by_username.email.is_none());

        let by_email =
            validate_login(&request(None, Some("A@X.com"), "secret1")).expect("valid login");
        assert_eq!(by_email.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn validate_login_rejects_short_password() {
        assert!(matches!(
            validate_login(&request(Some("alice"), None, "tiny")),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn validate_login_rejects_malformed_email() {
        assert!(matches!(
            validate_login(&request(None, Some("not-an-email"), "secret1")),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn credential_failure_is_a_single_class() {
        // Both the unknown-identity and wrong-password paths use this exact
        // failure, so callers cannot tell them apart.
        assert!(matches!(credential_failure(), ApiError::Unauthorized(_)));
    }
}
