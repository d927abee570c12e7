use std::sync::Arc;

use tracing::info;

use crate::config::{establish_connection, AppConfig};
use crate::domain::chat::{
    ChatClient, ChatError, GroupMembership, IdentityResolver, Notifier, WebhookNotifier,
};
use crate::domain::questionnaire::reminder::ReminderScheduler;
use crate::store::{MemoryStore, SeaOrmStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
    pub identity: Arc<dyn IdentityResolver>,
    pub groups: Arc<dyn GroupMembership>,
    pub notifier: Arc<dyn Notifier>,
    pub reminders: ReminderScheduler,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("database connection failed: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("chat client setup failed: {0}")]
    Chat(#[from] ChatError),
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        config: AppConfig,
        identity: Arc<dyn IdentityResolver>,
        groups: Arc<dyn GroupMembership>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let reminders =
            ReminderScheduler::new(store.clone(), groups.clone(), notifier.clone(), &config);
        Self {
            store,
            config,
            identity,
            groups,
            notifier,
            reminders,
        }
    }

    /// Builds the production collaborators described by `config`
    pub async fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => Arc::new(SeaOrmStore::new(establish_connection(url).await?)),
            None => {
                info!("using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let chat = Arc::new(ChatClient::new(&config.chat)?);
        let notifier = Arc::new(WebhookNotifier::from_config(&config.chat)?);

        Ok(Self::new(store, config, chat.clone(), chat, notifier))
    }
}
