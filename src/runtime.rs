//! Runtime services and shared state for the bot.

use tracing::{Instrument, error, info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::{factory::ProcessorFactory, filter::FilterChain, handler::MessageHandler, invoker::ProcessorInvoker, notifier::Notifier, storage::ProcessorStorage},
    service::{chat::ChatClient, db::DbClient, rocket::RocketChatClient, subscription::SubscriptionService},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the clients, the message handler, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The database client instance.
    pub db: DbClient,
    /// The chat client instance.
    pub chat: ChatClient,
    /// The Rocket.Chat client, when a server is configured.
    pub rocket: Option<RocketChatClient>,
    /// Subscription rules on top of the database.
    pub subscriptions: SubscriptionService,
    /// Pending conversations.
    pub storage: ProcessorStorage,
    /// Handler the chat client hands inbound messages to.
    pub handler: MessageHandler,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the database.
        let db = DbClient::surreal(&config).await?;

        // Initialize the chat client.
        let chat = ChatClient::telegram(&config).await?;

        // Initialize the Rocket.Chat client.
        let rocket = RocketChatClient::rest(&config)?;

        Self::with_clients(config, db, chat, rocket)
    }

    /// Wires the interaction layer on top of already created clients.
    pub fn with_clients(config: Config, db: DbClient, chat: ChatClient, rocket: Option<RocketChatClient>) -> Res<Self> {
        let subscriptions = SubscriptionService::new(db.clone(), config.subscription_secret());
        let storage = ProcessorStorage::new(Some(config.conversation_ttl));

        let filters = FilterChain::standard(storage.clone(), config.bot_name())?;
        let invoker = ProcessorInvoker::new(storage.clone(), ProcessorFactory::new(chat.clone(), subscriptions.clone()));
        let handler = MessageHandler::new(filters, invoker);

        Ok(Self {
            config,
            db,
            chat,
            rocket,
            subscriptions,
            storage,
            handler,
        })
    }

    /// The notifier, when a Rocket.Chat server is configured.
    pub fn notifier(&self) -> Option<Notifier> {
        let rocket = self.rocket.clone()?;

        Some(Notifier::new(rocket, self.chat.clone(), self.subscriptions.clone(), self.config.message_check_interval, self.config.rocket_chat_message_count))
    }

    /// Runs the chat client until it shuts down, with the notifier alongside it.
    pub async fn start(&self) -> Void {
        let notifier = match self.notifier() {
            Some(notifier) => Some(tokio::spawn(
                async move {
                    if let Err(err) = notifier.run().await {
                        error!("Notifier stopped: {}", err);
                    }
                }
                .in_current_span(),
            )),
            None => {
                info!("No Rocket.Chat server configured; notifications are disabled.");
                None
            }
        };

        let result = self.chat.start(self.handler.clone()).await;

        if let Some(task) = notifier {
            task.abort();
        }

        result
    }
}
