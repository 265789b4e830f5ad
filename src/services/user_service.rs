//! Account lifecycle: registration, login, password policy, federation, and
//! the administration rules gated by `auth::policy`.

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::{password_status, PasswordStatus};
use crate::auth::policy::{self, Role};
use crate::auth::{self, Claims, TokenError};
use crate::config;
use crate::database::collection::{collection, Collection};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::User;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Password expired")]
    PasswordExpired,
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation: {0}")]
    Validation(String),
    #[error("Reset token invalid or expired")]
    InvalidResetToken,
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl From<sqlx::Error> for UserError {
    fn from(e: sqlx::Error) -> Self {
        UserError::Database(DatabaseError::Sqlx(e))
    }
}

pub struct LoginOutcome {
    pub user: User,
    pub token: String,
    pub status: PasswordStatus,
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub async fn new() -> Result<Self, UserError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// Register a new account. The first registrant while zero Admins exist
    /// becomes Admin (and must carry a name); requesting Admin at any other
    /// time is forbidden; Moderator may be requested freely.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        requested_role: Option<Role>,
        name: Option<&str>,
    ) -> Result<User, UserError> {
        validate_email(email)?;
        validate_password(password)?;

        let admins = self.admin_count().await?;
        let role = resolve_registration_role(admins, requested_role, name)?;

        let hash = auth::hash_password(password)?;
        let user = self.insert_user(email, &hash, role, name.unwrap_or(""), "local").await?;

        // Profile is created alongside registration; its loss is not fatal.
        if let Err(e) = self.create_profile(user.id).await {
            tracing::warn!(user_id = %user.id, "failed to create profile: {}", e);
        }

        Ok(user)
    }

    /// Authenticate and issue a 30-day token. Unknown email and wrong password
    /// produce the same error. Expired passwords block token issuance.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, UserError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        if !auth::verify_password(password, &user.password_hash) {
            return Err(UserError::InvalidCredentials);
        }

        let status = password_status(user.last_password_update, Utc::now());
        if status == PasswordStatus::Expired {
            return Err(UserError::PasswordExpired);
        }

        let token = auth::generate_token(&Claims::new(user.id, user.role()))?;
        Ok(LoginOutcome { user, token, status })
    }

    /// Issue a reset token with a short expiry. Unknown email is a 404 here,
    /// unlike login's uniform message.
    pub async fn forgot_password(&self, email: &str) -> Result<(User, String), UserError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| UserError::NotFound("No account with that email".to_string()))?;

        let token = auth::generate_reset_token();
        let ttl = config::config().security.reset_token_ttl_minutes;
        let expiration = Utc::now() + Duration::minutes(ttl);

        sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expiration = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&token)
        .bind(expiration)
        .execute(&self.pool)
        .await?;

        Ok((user, token))
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User, UserError> {
        validate_password(new_password)?;

        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE reset_token = $1 AND reset_token_expiration > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(UserError::InvalidResetToken)?;

        let hash = auth::hash_password(new_password)?;
        let updated = sqlx::query_as::<_, User>(
            "UPDATE users SET password_hash = $2, reset_token = NULL, \
             reset_token_expiration = NULL, last_password_update = now(), updated_at = now() \
             WHERE id = $1 RETURNING *",
        )
        .bind(user.id)
        .bind(&hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn update_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<User, UserError> {
        validate_password(new_password)?;

        let user = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| UserError::NotFound("User not found".to_string()))?;

        if !auth::verify_password(current_password, &user.password_hash) {
            return Err(UserError::Validation("Current password is incorrect".to_string()));
        }

        let hash = auth::hash_password(new_password)?;
        let updated = sqlx::query_as::<_, User>(
            "UPDATE users SET password_hash = $2, last_password_update = now(), \
             updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(&hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn update_email(&self, user_id: Uuid, new_email: &str) -> Result<User, UserError> {
        validate_email(new_email)?;

        let result = sqlx::query_as::<_, User>(
            "UPDATE users SET email = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(new_email)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(UserError::NotFound("User not found".to_string())),
            Err(e) if is_unique_violation(&e) => Err(UserError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// First login through an OAuth provider creates the account; later logins
    /// reuse it. Federated accounts get a random local password hash.
    pub async fn oauth_login(
        &self,
        provider: &str,
        email: &str,
        name: &str,
    ) -> Result<LoginOutcome, UserError> {
        validate_email(email)?;

        let user = match self.find_by_email(email).await? {
            Some(user) => user,
            None => {
                let hash = auth::hash_password(&auth::generate_reset_token())?;
                let user = self.insert_user(email, &hash, Role::User, name, provider).await?;
                if let Err(e) = self.create_profile(user.id).await {
                    tracing::warn!(user_id = %user.id, "failed to create profile: {}", e);
                }
                user
            }
        };

        let token = auth::generate_token(&Claims::new(user.id, user.role()))?;
        let status = password_status(user.last_password_update, Utc::now());
        Ok(LoginOutcome { user, token, status })
    }

    pub async fn list(&self) -> Result<Vec<User>, UserError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn delete_user(
        &self,
        actor_id: Uuid,
        actor_role: Role,
        target_id: Uuid,
    ) -> Result<User, UserError> {
        let target = self
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| UserError::NotFound("User not found".to_string()))?;

        if !policy::can_delete_user(actor_id, actor_role, target.id, target.role()) {
            return Err(UserError::Forbidden(
                "You are not allowed to delete this account".to_string(),
            ));
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(target_id)
            .execute(&self.pool)
            .await?;

        Ok(target)
    }

    pub async fn change_role(
        &self,
        actor_id: Uuid,
        actor_role: Role,
        target_id: Uuid,
        new_role: Role,
    ) -> Result<User, UserError> {
        let target = self
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| UserError::NotFound("User not found".to_string()))?;

        if !policy::can_change_role(actor_id, actor_role, target.id, target.role(), new_role) {
            return Err(UserError::Forbidden(
                "You are not allowed to change this account's role".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(target_id)
        .bind(new_role.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Startup routine: ensure the single expected SuperAdmin account exists.
    pub async fn seed_superadmin(&self, email: &str, password: &str) -> Result<(), UserError> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'SuperAdmin'")
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Ok(());
        }

        let hash = auth::hash_password(password)?;
        match self.insert_user(email, &hash, Role::SuperAdmin, "Super Admin", "local").await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "seeded SuperAdmin account");
                Ok(())
            }
            Err(UserError::EmailTaken) => {
                tracing::warn!("SuperAdmin seed email already registered with a different role");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Admins only: a seeded SuperAdmin must not suppress the first-Admin
    /// bootstrap.
    async fn admin_count(&self) -> Result<i64, UserError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'Admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
        name: &str,
        provider: &str,
    ) -> Result<User, UserError> {
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, role, name, provider) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(name)
        .bind(provider)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(UserError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_profile(&self, user_id: Uuid) -> Result<(), UserError> {
        let spec = collection("profiles").expect("profiles collection registered");
        let profiles = Collection::new(spec, self.pool.clone());
        profiles
            .create(&json!({
                "userId": user_id,
                "preferredSectors": [],
                "preferredCountries": [],
                "preferredPostTypes": [],
                "notificationsEnabled": true,
            }))
            .await?;
        Ok(())
    }
}

/// Role granted to a registrant given how many Admin accounts exist.
///
/// While zero Admins exist the registrant becomes Admin (and must carry a
/// name); afterwards Admin/SuperAdmin requests are forbidden, Moderator may
/// be requested freely, and everything else defaults to User.
fn resolve_registration_role(
    admin_count: i64,
    requested: Option<Role>,
    name: Option<&str>,
) -> Result<Role, UserError> {
    if admin_count == 0 {
        if name.map(str::trim).unwrap_or("").is_empty() {
            return Err(UserError::Validation(
                "Name is required for the first administrator".to_string(),
            ));
        }
        return Ok(Role::Admin);
    }

    match requested {
        Some(Role::Admin) | Some(Role::SuperAdmin) => Err(UserError::Forbidden(
            "Only a SuperAdmin can create Admin accounts".to_string(),
        )),
        Some(Role::Moderator) => Ok(Role::Moderator),
        _ => Ok(Role::User),
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn validate_email(email: &str) -> Result<(), UserError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(UserError::Validation("Invalid email format".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), UserError> {
    if password.len() < 8 {
        return Err(UserError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}
