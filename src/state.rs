use std::sync::Arc;

use crate::services::mailer::Mailer;
use crate::services::storage::ObjectStore;

/// Process-wide collaborators constructed once at startup and injected into
/// handlers, instead of module-level singletons.
#[derive(Clone)]
pub struct AppState {
    pub mailer: Arc<Mailer>,
    pub store: Arc<dyn ObjectStore>,
}
