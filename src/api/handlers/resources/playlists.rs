//! Playlist lifecycle and membership management.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    storage,
    types::{CreatePlaylistRequest, PlaylistResponse, UpdatePlaylistRequest},
};
use crate::api::{
    error::ApiError,
    handlers::{
        auth::{types::MessageResponse, Principal},
        authz::ensure_owner,
    },
};

/// Loads the playlist's owner and authorizes the caller against it.
async fn authorize_playlist(
    pool: &PgPool,
    id: Uuid,
    principal: &Principal,
) -> Result<(), ApiError> {
    let owner_id = storage::playlist_owner(pool, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    ensure_owner(owner_id, principal)
}

#[utoipa::path(
    post,
    path = "/v1/playlists",
    request_body = CreatePlaylistRequest,
    responses(
        (status = 201, description = "Playlist created", body = PlaylistResponse),
        (status = 400, description = "Missing name")
    ),
    tag = "playlists"
)]
pub async fn create_playlist(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<CreatePlaylistRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PlaylistResponse>), ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidInput("Name is required".to_string()));
    }
    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let playlist = storage::insert_playlist(&pool, principal.user_id, name, description)
        .await
        .map_err(ApiError::Internal)?;

    Ok((StatusCode::CREATED, Json(playlist)))
}

#[utoipa::path(
    patch,
    path = "/v1/playlists/{id}",
    params(("id" = Uuid, Path, description = "Playlist id")),
    request_body = UpdatePlaylistRequest,
    responses(
        (status = 200, description = "Playlist updated", body = PlaylistResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such playlist")
    ),
    tag = "playlists"
)]
pub async fn update_playlist(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdatePlaylistRequest>, JsonRejection>,
) -> Result<Json<PlaylistResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;

    let name = request.name.as_deref().map(str::trim);
    if name == Some("") {
        return Err(ApiError::InvalidInput("Name must not be blank".to_string()));
    }
    if name.is_none() && request.description.is_none() {
        return Err(ApiError::InvalidInput(
            "Nothing to update".to_string(),
        ));
    }

    authorize_playlist(&pool, id, &principal).await?;

    let playlist = storage::update_playlist(&pool, id, name, request.description.as_deref())
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(playlist))
}

#[utoipa::path(
    delete,
    path = "/v1/playlists/{id}",
    params(("id" = Uuid, Path, description = "Playlist id")),
    responses(
        (status = 204, description = "Playlist deleted"),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such playlist")
    ),
    tag = "playlists"
)]
pub async fn delete_playlist(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize_playlist(&pool, id, &principal).await?;

    storage::delete_playlist(&pool, id)
        .await
        .map_err(ApiError::Internal)?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/playlists/{id}/videos/{video_id}",
    params(
        ("id" = Uuid, Path, description = "Playlist id"),
        ("video_id" = Uuid, Path, description = "Video id")
    ),
    responses(
        (status = 200, description = "Video added", body = MessageResponse),
        (status = 403, description = "Playlist owned by another user"),
        (status = 404, description = "No such playlist or video")
    ),
    tag = "playlists"
)]
pub async fn add_video(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path((id, video_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    authorize_playlist(&pool, id, &principal).await?;

    if !storage::video_exists(&pool, video_id)
        .await
        .map_err(ApiError::Internal)?
    {
        return Err(ApiError::NotFound("Video not found".to_string()));
    }

    storage::add_playlist_video(&pool, id, video_id)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(MessageResponse::new("Video added to playlist")))
}

#[utoipa::path(
    delete,
    path = "/v1/playlists/{id}/videos/{video_id}",
    params(
        ("id" = Uuid, Path, description = "Playlist id"),
        ("video_id" = Uuid, Path, description = "Video id")
    ),
    responses(
        (status = 200, description = "Video removed", body = MessageResponse),
        (status = 403, description = "Playlist owned by another user"),
        (status = 404, description = "No such playlist, or video not in it")
    ),
    tag = "playlists"
)]
pub async fn remove_video(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    Path((id, video_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    authorize_playlist(&pool, id, &principal).await?;

    let removed = storage::remove_playlist_video(&pool, id, video_id)
        .await
        .map_err(ApiError::Internal)?;
    if !removed {
        return Err(ApiError::NotFound("Video not in playlist".to_string()));
    }

    Ok(Json(MessageResponse::new("Video removed from playlist")))
}
