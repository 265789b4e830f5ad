use once_cell::sync::Lazy;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub smtp: SmtpConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub password_expiry_days: i64,
    pub password_reminder_days: i64,
    pub reset_token_ttl_minutes: i64,
    /// Seed identity for the single expected SuperAdmin account.
    pub superadmin_email: Option<String>,
    pub superadmin_password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    /// Base URL embedded in password-reset links.
    pub reset_link_base: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub public_base_url: Option<String>,
    /// When set, uploads fail with 503 instead of falling back to memory.
    pub require_s3: bool,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_bytes: usize,
    pub allowed_extensions: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        Self {
            environment,
            database: DatabaseConfig {
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
                acquire_timeout_secs: env_parse("DATABASE_ACQUIRE_TIMEOUT", 5),
            },
            security: SecurityConfig {
                jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
                jwt_expiry_days: env_parse("JWT_EXPIRY_DAYS", 30),
                password_expiry_days: env_parse("PASSWORD_EXPIRY_DAYS", 30),
                password_reminder_days: env_parse("PASSWORD_REMINDER_DAYS", 25),
                reset_token_ttl_minutes: env_parse("RESET_TOKEN_TTL_MINUTES", 15),
                superadmin_email: env::var("SUPERADMIN_EMAIL").ok(),
                superadmin_password: env::var("SUPERADMIN_PASSWORD").ok(),
            },
            smtp: SmtpConfig {
                host: env::var("SMTP_HOST").ok(),
                username: env::var("SMTP_USERNAME").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
                from_address: env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "no-reply@veerive.com".to_string()),
                reset_link_base: env::var("RESET_LINK_BASE")
                    .unwrap_or_else(|_| "http://localhost:3000/reset-password".to_string()),
            },
            storage: StorageConfig {
                s3_bucket: env::var("S3_BUCKET").ok(),
                s3_region: env::var("S3_REGION").ok(),
                public_base_url: env::var("STORAGE_PUBLIC_BASE_URL").ok(),
                require_s3: env::var("STORAGE_REQUIRE_S3")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false),
            },
            uploads: UploadConfig {
                max_bytes: env_parse("UPLOAD_MAX_BYTES", 5 * 1024 * 1024),
                allowed_extensions: env::var("UPLOAD_ALLOWED_EXTENSIONS")
                    .map(|v| v.split(',').map(|s| s.trim().to_lowercase()).collect())
                    .unwrap_or_else(|_| {
                        ["png", "jpg", "jpeg", "gif", "webp", "pdf"]
                            .iter()
                            .map(|s| s.to_string())
                            .collect()
                    }),
            },
        }
    }

    /// SMTP is optional; without a host the mailer logs and drops outbound mail.
    pub fn smtp_configured(&self) -> bool {
        self.smtp.host.is_some()
    }

    /// S3 is optional; without a bucket uploads land in the memory store.
    pub fn s3_configured(&self) -> bool {
        self.storage.s3_bucket.is_some()
    }
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        let config = AppConfig::from_env();
        assert_eq!(config.security.password_expiry_days, 30);
        assert_eq!(config.security.password_reminder_days, 25);
        assert_eq!(config.uploads.max_bytes, 5 * 1024 * 1024);
        assert!(config.uploads.allowed_extensions.contains(&"png".to_string()));
    }
}
