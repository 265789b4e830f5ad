//! Role allowlist gates applied per route group. SuperAdmin always passes.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::auth::policy::{is_allowed, Role};
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Taxonomy mutation routes: Admin and Moderator.
pub async fn require_editor(request: Request, next: Next) -> Result<Response, ApiError> {
    gate(request, next, &[Role::Admin, Role::Moderator]).await
}

/// User administration routes: Admin only.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    gate(request, next, &[Role::Admin]).await
}

async fn gate(request: Request, next: Next, allowed: &[Role]) -> Result<Response, ApiError> {
    let auth = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !is_allowed(auth.role, allowed) {
        return Err(ApiError::forbidden(format!(
            "Role {} is not allowed to perform this operation",
            auth.role
        )));
    }

    Ok(next.run(request).await)
}
