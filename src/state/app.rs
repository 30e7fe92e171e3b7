use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::services::registry_service::RegistryHandle;

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: RegistryHandle,

    /// Content published when the request does not name its own.
    pub payload: Arc<str>,

    pub max_hold: Option<Duration>,
}

impl AppState {
    pub fn new(registry: RegistryHandle, cfg: &AppConfig) -> Self {
        Self {
            registry,
            payload: Arc::from(cfg.payload.as_str()),
            max_hold: cfg.max_hold(),
        }
    }
}
