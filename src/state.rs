use std::sync::Arc;
use crate::config::Config;
use crate::ws::registry::RoomRegistry;

/// Shared application state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(RoomRegistry::new()),
        }
    }
}
