//! Re-checks the password-expiry policy on every gated request made by an
//! Admin, not only at login. The reminder mail is attempted once per
//! qualifying request; its failure never blocks the request.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::auth::password::{password_status, PasswordStatus};
use crate::auth::Role;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::user_service::UserService;
use crate::state::AppState;

/// Changing the password is the way back out of Expired, so that route must
/// stay reachable through this gate.
fn is_recovery_route(path: &str) -> bool {
    path == "/api/auth/password"
}

pub async fn check_password_expiry(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_recovery_route(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let auth = match request.extensions().get::<AuthUser>() {
        Some(auth) if auth.role == Role::Admin => auth.clone(),
        // Policy applies to Admin-role requests only
        _ => return Ok(next.run(request).await),
    };

    let service = UserService::new().await?;
    let user = service
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    match password_status(user.last_password_update, Utc::now()) {
        PasswordStatus::Expired => Err(ApiError::password_expired(
            "Password expired. Please reset your password to continue.",
        )),
        PasswordStatus::ReminderDue { days_left } => {
            state.mailer.send_expiry_reminder(user.email.clone(), days_left);
            Ok(next.run(request).await)
        }
        PasswordStatus::Fresh => Ok(next.run(request).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_update_stays_reachable_when_expired() {
        assert!(is_recovery_route("/api/auth/password"));
    }

    #[test]
    fn other_api_routes_are_gated() {
        assert!(!is_recovery_route("/api/posts"));
        assert!(!is_recovery_route("/api/auth/email"));
        assert!(!is_recovery_route("/api/auth/password/extra"));
    }
}
