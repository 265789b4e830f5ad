//! Authentication endpoints: registration, login, password lifecycle, and
//! OAuth federation.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::password::PasswordStatus;
use crate::auth::policy::Role;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::AuthUser;
use crate::services::user_service::UserService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub name: Option<String>,
}

/// POST /auth/register
pub async fn register(Json(payload): Json<RegisterRequest>) -> ApiResult<Value> {
    let requested_role = match payload.role.as_deref() {
        Some(s) => Some(
            Role::parse(s).ok_or_else(|| ApiError::validation_error("Unknown role", None))?,
        ),
        None => None,
    };

    let service = UserService::new().await?;
    let user = service
        .register(
            &payload.email,
            &payload.password,
            requested_role,
            payload.name.as_deref(),
        )
        .await?;

    Ok(ApiResponse::created(user.to_api()))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Value> {
    let service = UserService::new().await?;
    let outcome = service.login(&payload.email, &payload.password).await?;

    if let PasswordStatus::ReminderDue { days_left } = outcome.status {
        state
            .mailer
            .send_expiry_reminder(outcome.user.email.clone(), days_left);
    }

    Ok(ApiResponse::success(json!({
        "token": outcome.token,
        "user": outcome.user.to_api(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// POST /auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Value> {
    let service = UserService::new().await?;
    let (user, token) = service.forgot_password(&payload.email).await?;

    state.mailer.send_password_reset(user.email, token);

    Ok(ApiResponse::success(json!({
        "message": "Password reset email sent"
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// POST /auth/reset-password
pub async fn reset_password(Json(payload): Json<ResetPasswordRequest>) -> ApiResult<Value> {
    let service = UserService::new().await?;
    service
        .reset_password(&payload.token, &payload.new_password)
        .await?;

    Ok(ApiResponse::success(json!({
        "message": "Password has been reset"
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// PUT /api/auth/password
pub async fn update_password(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> ApiResult<Value> {
    let service = UserService::new().await?;
    let user = service
        .update_password(auth.user_id, &payload.current_password, &payload.new_password)
        .await?;

    Ok(ApiResponse::success(user.to_api()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmailRequest {
    pub new_email: String,
}

/// PUT /api/auth/email
pub async fn update_email(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<UpdateEmailRequest>,
) -> ApiResult<Value> {
    let service = UserService::new().await?;
    let user = service.update_email(auth.user_id, &payload.new_email).await?;

    Ok(ApiResponse::success(user.to_api()))
}

/// GET /api/auth/whoami
pub async fn whoami(Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    let service = UserService::new().await?;
    let user = service
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    Ok(ApiResponse::success(user.to_api()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthRequest {
    pub provider: String,
    pub access_token: String,
}

/// POST /auth/oauth - federated login
///
/// The front-end completes the provider flow and hands the access token here;
/// the server verifies it against the provider's userinfo endpoint before
/// creating or reusing the account.
pub async fn oauth_login(Json(payload): Json<OAuthRequest>) -> ApiResult<Value> {
    let (email, name) = fetch_provider_profile(&payload.provider, &payload.access_token).await?;

    let service = UserService::new().await?;
    let outcome = service.oauth_login(&payload.provider, &email, &name).await?;

    Ok(ApiResponse::success(json!({
        "token": outcome.token,
        "user": outcome.user.to_api(),
    })))
}

async fn fetch_provider_profile(
    provider: &str,
    access_token: &str,
) -> Result<(String, String), ApiError> {
    let userinfo_url = match provider {
        "google" => "https://www.googleapis.com/oauth2/v3/userinfo",
        "facebook" => "https://graph.facebook.com/me?fields=name,email",
        "linkedin" => "https://api.linkedin.com/v2/userinfo",
        "twitter" => "https://api.twitter.com/2/users/me?user.fields=name",
        _ => return Err(ApiError::bad_request(format!("Unknown provider: {}", provider))),
    };

    let response = reqwest::Client::new()
        .get(userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!("userinfo call to {} failed: {}", provider, e);
            ApiError::service_unavailable("Identity provider unreachable")
        })?;

    if !response.status().is_success() {
        return Err(ApiError::unauthorized("Provider rejected the access token"));
    }

    let profile: Value = response
        .json()
        .await
        .map_err(|_| ApiError::unauthorized("Provider returned an unexpected response"))?;

    let email = profile
        .get("email")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            ApiError::bad_request("Provider did not share an email address for this account")
        })?
        .to_string();
    let name = profile
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    Ok((email, name))
}
