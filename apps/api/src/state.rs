use std::sync::Arc;

use crate::config::Config;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend. `PgStore` in production.
    pub store: Arc<dyn Store>,
    pub config: Config,
}
