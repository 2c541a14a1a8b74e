pub mod surreal;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::base::{error::SubscriptionError, types::ChatId};

// Types.

/// Result of a subscriber store operation.
pub type SubRes<T> = Result<T, SubscriptionError>;

/// A custom notification text for messages that mention a given user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionConfiguration {
    pub mentioned_username: String,
    pub notification_text: String,
}

/// A subscribed chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub chat_id: ChatId,
    #[serde(default)]
    pub mentions: Vec<MentionConfiguration>,
}

impl Subscriber {
    pub fn new(chat_id: ChatId) -> Self {
        Self { chat_id, mentions: Vec::new() }
    }
}

// Traits.

/// Generic database client trait that clients must implement.
///
/// This trait defines the keyed collection of subscribers the bot notifies. Implementing
/// this trait allows different database backends to be used with the bot.
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Adds a chat to the subscribers.
    ///
    /// Fails with [`SubscriptionError::AlreadyExists`] when the chat is already subscribed.
    async fn add_subscriber(&self, chat_id: ChatId) -> SubRes<()>;

    /// Removes a chat from the subscribers.
    ///
    /// Fails with [`SubscriptionError::NotFound`] when the chat is not subscribed.
    async fn remove_subscriber(&self, chat_id: ChatId) -> SubRes<()>;

    /// Lists all subscribers.
    async fn get_subscribers(&self) -> SubRes<Vec<Subscriber>>;
}

// Structs.

/// Database client for the bot.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}
