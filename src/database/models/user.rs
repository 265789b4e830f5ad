use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::Role;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub name: String,
    pub provider: String,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expiration: Option<DateTime<Utc>>,
    pub last_password_update: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Stored role string as the closed enum; unknown strings degrade to User.
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::User)
    }

    /// Client-facing shape; credential and reset fields never leave the server.
    pub fn to_api(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "role": self.role,
            "name": self.name,
            "provider": self.provider,
            "lastPasswordUpdate": self.last_password_update,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            role: "Admin".to_string(),
            name: "A".to_string(),
            provider: "local".to_string(),
            reset_token: Some("tok".to_string()),
            reset_token_expiration: None,
            last_password_update: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn api_shape_never_exposes_credentials() {
        let value = sample().to_api();
        assert!(value.get("password_hash").is_none());
        assert!(value.get("resetToken").is_none());
        assert_eq!(value["role"], "Admin");
    }

    #[test]
    fn unknown_role_degrades_to_user() {
        let mut user = sample();
        user.role = "Owner".to_string();
        assert_eq!(user.role(), Role::User);
    }
}
