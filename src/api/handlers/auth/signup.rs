//! Signup: validate, upload media, create the identity, auto-login.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use super::{
    password::hash_password,
    session::{establish_session, session_cookie_headers},
    state::AuthState,
    storage::{self, NewUser, SignupOutcome},
    types::{SignupRequest, UserResponse},
    utils::{normalize_identifier, required_field, valid_email, validate_password},
};
use crate::api::error::ApiError;
use crate::media::SharedMediaStore;

/// Signup input after validation and normalization.
struct ValidSignup {
    username: String,
    email: String,
    full_name: String,
    password: String,
    avatar_source: String,
    cover_source: Option<String>,
}

fn validate_signup(request: &SignupRequest) -> Result<ValidSignup, ApiError> {
    let username = normalize_identifier(&required_field("username", &request.username)?);
    let email = normalize_identifier(&required_field("email", &request.email)?);
    let full_name = required_field("full_name", &request.full_name)?;
    let avatar_source = required_field("avatar", &request.avatar)?;

    validate_password(&request.password)?;

    if !valid_email(&email) {
        return Err(ApiError::InvalidInput("Invalid email format".to_string()));
    }

    let cover_source = request
        .cover_image
        .as_deref()
        .map(str::trim)
        .filter(|source| !source.is_empty())
        .map(str::to_string);

    Ok(ValidSignup {
        username,
        email,
        full_name,
        password: request.password.clone(),
        avatar_source,
        cover_source,
    })
}

#[utoipa::path(
    post,
    path = "/v1/users/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Identity created, cookies set", body = UserResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Username or email already registered")
    ),
    tag = "users"
)]
pub async fn signup(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    Extension(media): Extension<SharedMediaStore>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) =
        body.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;
    let input = validate_signup(&request)?;

    // Media references are resolved before the identity exists, so a failed
    // upload never leaves a partially created user behind.
    let avatar = media
        .upload(&input.avatar_source)
        .await
        .map_err(ApiError::Internal)?;
    let cover_url = match &input.cover_source {
        Some(source) => Some(media.upload(source).await.map_err(ApiError::Internal)?.url),
        None => None,
    };

    let password_hash = hash_password(&input.password)
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("password hashing failed: {err}")))?;

    let new_user = NewUser {
        username: &input.username,
        email: &input.email,
        full_name: &input.full_name,
        password_hash: &password_hash,
        avatar_url: &avatar.url,
        cover_url: cover_url.as_deref(),
    };

    let user = match storage::insert_user(&pool, &new_user)
        .await
        .map_err(ApiError::Internal)?
    {
        SignupOutcome::Created(user) => user,
        SignupOutcome::Conflict => {
            // The identity already existed, so the uploads resolved above
            // are orphans; drop them before reporting the conflict.
            discard_assets(&media, &[Some(avatar.url.as_str()), cover_url.as_deref()]).await;
            return Err(ApiError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }
    };

    info!(user_id = %user.id, "user signed up");

    let tokens = establish_session(&pool, &state, user.id).await?;
    let headers = session_cookie_headers(&state, &tokens)?;

    Ok((
        StatusCode::CREATED,
        headers,
        Json(json!({ "user": UserResponse::from(user) })),
    ))
}

/// Best-effort removal of already-uploaded assets when signup does not go
/// through. Failures only leave orphans in the media store.
async fn discard_assets(media: &SharedMediaStore, urls: &[Option<&str>]) {
    for url in urls.iter().flatten() {
        if let Err(err) = media.delete(url).await {
            warn!(%url, "media cleanup failed: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::stub::StubMediaStore;
    use secrecy::SecretString;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
    use std::time::Duration;

    fn request() -> SignupRequest {
        SignupRequest {
            username: " Alice ".to_string(),
            email: "A@X.com".to_string(),
            full_name: "Alice Doe".to_string(),
            password: "secret1".to_string(),
            avatar: "avatar.png".to_string(),
            cover_image: None,
        }
    }

    #[test]
    fn validate_signup_normalizes_identifiers() {
        let input = validate_signup(&request()).expect("valid signup");
        assert_eq!(input.username, "alice");
        assert_eq!(input.email, "a@x.com");
        assert_eq!(input.full_name, "Alice Doe");
        assert_eq!(input.avatar_source, "avatar.png");
        assert!(input.cover_source.is_none());
    }

    #[test]
    fn validate_signup_rejects_blank_fields() {
        let mut blank = request();
        blank.username = "  ".to_string();
        assert!(matches!(
            validate_signup(&blank),
            Err(ApiError::InvalidInput(_))
        ));

        let mut blank = request();
        blank.avatar = String::new();
        assert!(matches!(
            validate_signup(&blank),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn validate_signup_rejects_short_password() {
        let mut short = request();
        short.password = "tiny".to_string();
        assert!(matches!(
            validate_signup(&short),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn validate_signup_rejects_bad_email() {
        let mut bad = request();
        bad.email = "not-an-email".to_string();
        assert!(matches!(
            validate_signup(&bad),
            Err(ApiError::InvalidInput(_))
        ));
    }

    fn unreachable_pool() -> PgPool {
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .username("invalid")
            .database("invalid")
            .ssl_mode(PgSslMode::Disable);
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy_with(options)
    }

    fn test_state() -> Arc<AuthState> {
        Arc::new(AuthState::new(super::super::state::AuthConfig::new(
            SecretString::from("access-secret"),
            SecretString::from("refresh-secret"),
        )))
    }

    #[tokio::test]
    async fn upload_failure_aborts_signup() {
        let stub = Arc::new(StubMediaStore::new(true));
        let media: SharedMediaStore = stub.clone();

        let result = signup(
            Extension(unreachable_pool()),
            Extension(test_state()),
            Extension(media),
            Ok(Json(request())),
        )
        .await;

        let Err(err) = result else {
            panic!("signup must fail when the upload fails");
        };
        assert!(matches!(err, ApiError::Internal(_)));
        // The upload failure is what aborted the flow; had the insert been
        // attempted first, the unreachable pool would surface a connection
        // error instead.
        assert!(err.to_string().contains("stub upload failure"));
        assert!(stub.deleted.lock().expect("stub delete log").is_empty());
    }

    #[tokio::test]
    async fn discard_assets_deletes_uploaded_urls() {
        let stub = Arc::new(StubMediaStore::new(false));
        let media: SharedMediaStore = stub.clone();

        discard_assets(
            &media,
            &[Some("https://media.test/avatar.png"), None],
        )
        .await;

        let deleted = stub.deleted.lock().expect("stub delete log");
        assert_eq!(deleted.as_slice(), ["https://media.test/avatar.png"]);
    }

    #[test]
    fn validate_signup_keeps_non_empty_cover() {
        let mut with_cover = request();
        with_cover.cover_image = Some(" cover.png ".to_string());
        let input = validate_signup(&with_cover).expect("valid signup");
        assert_eq!(input.cover_source.as_deref(), Some("cover.png"));

        let mut blank_cover = request();
        blank_cover.cover_image = Some("   ".to_string());
        let input = validate_signup(&blank_cover).expect("valid signup");
        assert!(input.cover_source.is_none());
    }
}
