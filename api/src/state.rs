use std::sync::Arc;

use rag_system::config::Config;
use rag_system::coordinator::Coordinator;

/// Shared process state, built once in `main` and handed to every route
/// via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub coordinator: Arc<Coordinator>,
}
