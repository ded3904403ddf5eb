use log::{info, warn};
use std::sync::Arc;

use crate::api::client::ApiClient;
use crate::chat::coordinator::ChatCoordinator;
use crate::chat::store::ChatStore;
use crate::config::Config;
use crate::contacts::coordinator::ContactCoordinator;
use crate::notify::Notifier;
use crate::query::QueryClient;
use crate::storage::{SessionPersistence, SqliteSessionStorage};

/// Everything the views need, wired once at startup.
pub struct AppContext {
    pub config: Config,
    pub client: Arc<ApiClient>,
    pub queries: Arc<QueryClient>,
    pub contacts: Arc<ContactCoordinator<ApiClient>>,
    pub chat: Arc<ChatCoordinator<ApiClient>>,
}

impl AppContext {
    pub fn new(
        config: Config,
        notifier: Arc<dyn Notifier>,
        persistence: Box<dyn SessionPersistence>,
    ) -> Self {
        info!("using backend {}", config.api_url);
        let client = Arc::new(ApiClient::new(&config.api_url));
        let queries = Arc::new(QueryClient::new());
        let store = Arc::new(ChatStore::load(persistence, config.session_bucket.clone()));
        let contacts = Arc::new(
            ContactCoordinator::new(client.clone(), queries.clone(), notifier.clone())
                .with_retry(config.retry_policy()),
        );
        let chat = Arc::new(
            ChatCoordinator::new(client.clone(), store, queries.clone(), notifier, config.chat)
                .with_retry(config.retry_policy()),
        );
        Self {
            config,
            client,
            queries,
            contacts,
            chat,
        }
    }

    /// Session storage on disk, or in memory when no data dir is usable.
    pub fn default_persistence() -> Box<dyn SessionPersistence> {
        match SqliteSessionStorage::open_default() {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!("session storage unavailable ({}), history will not persist", e);
                match SqliteSessionStorage::in_memory() {
                    Ok(store) => Box::new(store),
                    Err(_) => Box::new(NoPersistence),
                }
            }
        }
    }
}

struct NoPersistence;

impl SessionPersistence for NoPersistence {
    fn load(&self, _bucket: &str) -> Result<Option<String>, crate::error::StorageError> {
        Ok(None)
    }

    fn save(&self, _bucket: &str, _payload: &str) -> Result<(), crate::error::StorageError> {
        Ok(())
    }
}
