//! Ownership authorization, shared by every mutating resource operation.

use uuid::Uuid;

use super::auth::Principal;
use crate::api::error::ApiError;

/// Allow the operation only if `owner_id` is the authenticated identity.
///
/// Comparison is by id value; two materializations of the same logical id
/// are equal. Callers must confirm the resource exists before invoking
/// this, so a missing resource reports `NotFound` rather than `Forbidden`.
pub(crate) fn ensure_owner(owner_id: Uuid, principal: &Principal) -> Result<(), ApiError> {
    if owner_id == principal.user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You are not allowed to modify this resource".to_string(),
        ))
    }
}
