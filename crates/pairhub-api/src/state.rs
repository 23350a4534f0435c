//! Application state shared across all handlers.

use std::sync::Arc;

use pairhub_core::config::AppConfig;
use pairhub_realtime::server::RealtimeEngine;

/// Shared application state passed to every handler via Axum's `State`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Real-time engine.
    pub realtime: Arc<RealtimeEngine>,
}

impl AppState {
    /// Creates the state from a loaded configuration and a running engine.
    pub fn new(config: AppConfig, realtime: RealtimeEngine) -> Self {
        Self {
            config: Arc::new(config),
            realtime: Arc::new(realtime),
        }
    }
}
