pub mod auth;
pub mod authorize;
pub mod password_expiry;
pub mod response;

pub use auth::AuthUser;
