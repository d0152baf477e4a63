//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::infrastructure::registry::RoomRegistry;
use crate::infrastructure::store::QueueStore;
use crate::ui::sessions::SessionManager;
use crate::usecase::Dispatcher;

/// Everything the handlers share: the room registry behind its single
/// mutex, the persistent store, live connections and the notification
/// dispatcher.
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<Mutex<RoomRegistry>>,
    pub sessions: Arc<SessionManager>,
    pub store: Arc<dyn QueueStore>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(
        config: Arc<ServerConfig>,
        store: Arc<dyn QueueStore>,
        registry: RoomRegistry,
    ) -> Arc<Self> {
        let registry = Arc::new(Mutex::new(registry));
        let sessions = Arc::new(SessionManager::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&sessions),
        ));
        Arc::new(Self {
            config,
            registry,
            sessions,
            store,
            dispatcher,
        })
    }
}
