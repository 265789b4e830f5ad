pub mod context;
pub mod post;
pub mod user;

pub use context::{Context, ContextPostRef};
pub use post::Post;
pub use user::User;
