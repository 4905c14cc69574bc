//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::matchmaking::{MatchRegistry, MatchmakingService};
use crate::ws::transport::ConnectionHub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<ConnectionHub>,
    pub matchmaking: Arc<MatchmakingService>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let hub = Arc::new(ConnectionHub::new());
        let registry = Arc::new(MatchRegistry::new(config.match_capacity));

        // Arc for sharing across cloned AppState and timer tasks
        let matchmaking = Arc::new(MatchmakingService::new(registry, hub.clone()));

        Self {
            config,
            hub,
            matchmaking,
        }
    }
}
