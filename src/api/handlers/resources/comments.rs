//! Comment create, update and delete.
//!
//! Comments hang off a video; creating one checks the parent video first.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    storage,
    types::{CommentBody, CommentResponse},
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
    path = "/v1/videos/{video_id}/comments",
    params(("video_id" = Uuid, Path, description = "Video id")),
    request_body = CommentBody,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Empty content"),
        (status = 404, description = "No such video")
    ),
    tag = "comments"
)]
pub async fn create_comment(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path(video_id): Path<Uuid>,
    body: Result<Json<CommentBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;
    let content = validate_content(&request.content)?;

    if !storage::video_exists(&pool, video_id)
        .await
        .map_err(ApiError::Internal)?
    {
        return Err(ApiError::NotFound("Video not found".to_string()));
    }

    let comment = storage::insert_comment(&pool, principal.user_id, video_id, content)
        .await
        .map_err(ApiError::Internal)?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    patch,
    path = "/v1/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment id")),
    request_body = CommentBody,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such comment")
    ),
    tag = "comments"
)]
pub async fn update_comment(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    body: Result<Json<CommentBody>, JsonRejection>,
) -> Result<Json<CommentResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;
    let content = validate_content(&request.content)?;

    let owner_id = storage::comment_owner(&pool, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;
    ensure_owner(owner_id, &principal)?;

    let comment = storage::update_comment(&pool, id, content)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(comment))
}

#[utoipa::path(
    delete,
    path = "/v1/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such comment")
    ),
    tag = "comments"
)]
pub async fn delete_comment(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let owner_id = storage::comment_owner(&pool, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;
    ensure_owner(owner_id, &principal)?;

    storage::delete_comment(&pool, id)
        .await
        .map_err(ApiError::Internal)?;

    Ok(StatusCode::NO_CONTENT)
}
