//! Video publish, update and delete.
//!
//! Media uploads run before the row is inserted; on delete the row goes
//! first and asset cleanup is best effort.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::{
    storage::{self, NewVideo},
    types::{PublishVideoRequest, UpdateVideoRequest, VideoResponse},
};
use crate::{
    api::{
        error::ApiError,
        handlers::{auth::Principal, authz::ensure_owner},
    },
    media::SharedMediaStore,
};

struct ValidPublish<'a> {
    title: &'a str,
    description: Option<&'a str>,
    video: &'a str,
    thumbnail: &'a str,
}

fn validate_publish(request: &PublishVideoRequest) -> Result<ValidPublish<'_>, ApiError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::InvalidInput("Title is required".to_string()));
    }
    let video = request.video.trim();
    if video.is_empty() {
        return Err(ApiError::InvalidInput("Video file is required".to_string()));
    }
    let thumbnail = request.thumbnail.trim();
    if thumbnail.is_empty() {
        return Err(ApiError::InvalidInput(
            "Thumbnail file is required".to_string(),
        ));
    }
    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    Ok(ValidPublish {
        title,
        description,
        video,
        thumbnail,
    })
}

#[utoipa::path(
    post,
    path = "/v1/videos",
    request_body = PublishVideoRequest,
    responses(
        (status = 201, description = "Video published", body = VideoResponse),
        (status = 400, description = "Missing title or files"),
        (status = 500, description = "Media upload failed")
    ),
    tag = "videos"
)]
pub async fn publish_video(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Extension(media): Extension<SharedMediaStore>,
    body: Result<Json<PublishVideoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VideoResponse>), ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;
    let valid = validate_publish(&request)?;

    let video_asset = media
        .upload(valid.video)
        .await
        .map_err(ApiError::Internal)?;
    let thumbnail_asset = media
        .upload(valid.thumbnail)
        .await
        .map_err(ApiError::Internal)?;

    let video = storage::insert_video(
        &pool,
        &NewVideo {
            owner_id: principal.user_id,
            title: valid.title,
            description: valid.description,
            video_url: &video_asset.url,
            thumbnail_url: &thumbnail_asset.url,
            duration: video_asset.duration,
        },
    )
    .await
    .map_err(ApiError::Internal)?;

    Ok((StatusCode::CREATED, Json(video)))
}

#[utoipa::path(
    patch,
    path = "/v1/videos/{id}",
    params(("id" = Uuid, Path, description = "Video id")),
    request_body = UpdateVideoRequest,
    responses(
        (status = 200, description = "Video updated", body = VideoResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such video")
    ),
    tag = "videos"
)]
pub async fn update_video(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateVideoRequest>, JsonRejection>,
) -> Result<Json<VideoResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;

    let title = request.title.as_deref().map(str::trim);
    if title == Some("") {
        return Err(ApiError::InvalidInput(
            "Title must not be blank".to_string(),
        ));
    }
    if title.is_none() && request.description.is_none() {
        return Err(ApiError::InvalidInput("Nothing to update".to_string()));
    }

    let existing = storage::find_video(&pool, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;
    ensure_owner(existing.owner_id, &principal)?;

    let video = storage::update_video(&pool, id, title, request.description.as_deref())
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(video))
}

#[utoipa::path(
    patch,
    path = "/v1/videos/{id}/publish",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Publish state flipped", body = VideoResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such video")
    ),
    tag = "videos"
)]
pub async fn toggle_publish(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<VideoResponse>, ApiError> {
    let existing = storage::find_video(&pool, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;
    ensure_owner(existing.owner_id, &principal)?;

    let video = storage::toggle_publish(&pool, id)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(video))
}

#[utoipa::path(
    delete,
    path = "/v1/videos/{id}",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 204, description = "Video deleted"),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such video")
    ),
    tag = "videos"
)]
pub async fn delete_video(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Extension(media): Extension<SharedMediaStore>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = storage::find_video(&pool, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;
    ensure_owner(existing.owner_id, &principal)?;

    storage::delete_video(&pool, id)
        .await
        .map_err(ApiError::Internal)?;

    // The row is gone; a failed asset delete only leaves an orphan in the
    // media store.
    for url in [&existing.video_url, &existing.thumbnail_url] {
        if let Err(err) = media.delete(url).await {
            warn!(video_id = %id, %url, "media cleanup failed: {err:#}");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
