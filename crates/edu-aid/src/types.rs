/// Shared application state
use crate::analysis::Analyzer;
use crate::config::AppConfig;
use crate::store::SessionStore;
use std::sync::Arc;

/// State shared across all request handlers.
pub struct AppState {
    pub config: AppConfig,
    pub analyzer: Analyzer,
    pub store: Arc<dyn SessionStore>,
}
