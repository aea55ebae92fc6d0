pub mod config;
pub mod error;
pub mod lobby;
pub mod models;
pub mod routes;

use std::sync::Arc;

use config::Config;
use lobby::fanout::LobbyBroadcast;
use lobby::registry::{SessionRegistry, TableRegistry};

/// Shared application state available to all route handlers and gateway
/// sessions.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tables: Arc<TableRegistry>,
    pub sessions: Arc<SessionRegistry>,
    pub broadcast: Arc<LobbyBroadcast>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let broadcast = LobbyBroadcast::new(config.broadcast_capacity);
        Self {
            config: Arc::new(config),
            tables: Arc::new(TableRegistry::new()),
            sessions: Arc::new(SessionRegistry::new()),
            broadcast: Arc::new(broadcast),
        }
    }
}
