pub mod analyst;
pub mod auth;
pub mod contexts;
pub mod posts;
pub mod taxonomy;
pub mod uploads;
pub mod users;
