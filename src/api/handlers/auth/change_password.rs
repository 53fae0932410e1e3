//! Password change for an authenticated identity.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use sqlx::PgPool;
use tracing::info;

use super::{
    gate::Principal,
    password::{hash_password, verify_password},
    storage,
    types::{ChangePasswordRequest, MessageResponse},
    utils::validate_password,
};
use crate::api::error::ApiError;

#[utoipa::path(
    post,
    path = "/v1/users/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password too weak"),
        (status = 401, description = "Wrong current password or confirmation mismatch")
    ),
    tag = "users"
)]
pub async fn change_password(
    Extension(pool): Extension<PgPool>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) =
        body.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;

    let stored_hash = storage::find_password_hash(&pool, principal.user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired access token".to_string()))?;

    let verified = verify_password(&request.current_password, &stored_hash)
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("password verification failed: {err}")))?;
    if !verified {
        return Err(ApiError::Unauthorized(
            "Incorrect old password".to_string(),
        ));
    }

    if request.new_password != request.confirm_password {
        return Err(ApiError::Unauthorized(
            "New and confirm password do not match".to_string(),
        ));
    }

    validate_password(&request.new_password)?;

    let new_hash = hash_password(&request.new_password)
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("password hashing failed: {err}")))?;

    // Scoped single-column update; unrelated profile fields are not
    // revalidated here.
    storage::update_password_hash(&pool, principal.user_id, &new_hash)
        .await
        .map_err(ApiError::Internal)?;

    info!(user_id = %principal.user_id, "password changed");

    Ok(Json(MessageResponse::new("Password changed successfully")))
}
