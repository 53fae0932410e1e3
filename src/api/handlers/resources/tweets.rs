//! Tweet create, update and delete.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    storage,
    types::{TweetBody, TweetResponse},
};
use crate::api::{
    error::ApiError,
    handlers::{auth::Principal, authz::ensure_owner},
};

fn validate_content(content: &str) -> Result<&str, ApiError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ApiError::InvalidInput("Content is required".to_string()));
    }
    Ok(content)
}

#[utoipa::path(
    post,
    path = "/v1/tweets",
    request_body = TweetBody,
    responses(
        (status = 201, description = "Tweet created", body = TweetResponse),
        (status = 400, description = "Empty content"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "tweets"
)]
pub async fn create_tweet(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<TweetBody>, JsonRejection>,
) -> Result<(StatusCode, Json<TweetResponse>), ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;
    let content = validate_content(&request.content)?;

    let tweet = storage::insert_tweet(&pool, principal.user_id, content)
        .await
        .map_err(ApiError::Internal)?;

    Ok((StatusCode::CREATED, Json(tweet)))
}

#[utoipa::path(
    patch,
    path = "/v1/tweets/{id}",
    params(("id" = Uuid, Path, description = "Tweet id")),
    request_body = TweetBody,
    responses(
        (status = 200, description = "Tweet updated", body = TweetResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such tweet")
    ),
    tag = "tweets"
)]
pub async fn update_tweet(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    body: Result<Json<TweetBody>, JsonRejection>,
) -> Result<Json<TweetResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;
    let content = validate_content(&request.content)?;

    // Existence first, so a missing tweet never reads as a permission error.
    let owner_id = storage::tweet_owner(&pool, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Tweet not found".to_string()))?;
    ensure_owner(owner_id, &principal)?;

    let tweet = storage::update_tweet(&pool, id, content)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(tweet))
}

#[utoipa::path(
    delete,
    path = "/v1/tweets/{id}",
    params(("id" = Uuid, Path, description = "Tweet id")),
    responses(
        (status = 204, description = "Tweet deleted"),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such tweet")
    ),
    tag = "tweets"
)]
pub async fn delete_tweet(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let owner_id = storage::tweet_owner(&pool, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Tweet not found".to_string()))?;
    ensure_owner(owner_id, &principal)?;

    storage::delete_tweet(&pool, id)
        .await
        .map_err(ApiError::Internal)?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed() {
        assert_eq!(validate_content("  hello  ").ok(), Some("hello"));
    }

    #[test]
    fn blank_content_is_rejected() {
        assert!(matches!(
            validate_content("   "),
            Err(ApiError::InvalidInput(_))
        ));
    }
}
