pub mod context_sync;
pub mod mailer;
pub mod storage;
pub mod user_service;
