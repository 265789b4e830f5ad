//! User administration. The route group is gated by the Admin allowlist; the
//! per-target rules live in `auth::policy` and are enforced by the service.

use axum::extract::Path;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::policy::Role;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::user_service::UserService;

/// GET /api/admin/users
pub async fn list_users(Extension(_auth): Extension<AuthUser>) -> ApiResult<Vec<Value>> {
    let service = UserService::new().await?;
    let users = service.list().await?;
    Ok(ApiResponse::success(users.iter().map(|u| u.to_api()).collect()))
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let service = UserService::new().await?;
    let deleted = service.delete_user(auth.user_id, auth.role, id).await?;
    Ok(ApiResponse::success(deleted.to_api()))
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

/// PUT /api/admin/users/:id/role
pub async fn change_role(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeRoleRequest>,
) -> ApiResult<Value> {
    let new_role = Role::parse(&payload.role)
        .ok_or_else(|| ApiError::validation_error("Unknown role", None))?;

    let service = UserService::new().await?;
    let updated = service.change_role(auth.user_id, auth.role, id, new_role).await?;
    Ok(ApiResponse::success(updated.to_api()))
}
