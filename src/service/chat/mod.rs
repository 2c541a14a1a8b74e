pub mod telegram;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{
    base::types::{ChatId, MessageId, ReplyMarkup, Res, Void},
    interaction::handler::MessageHandler,
};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the transport the bot talks through: it delivers inbound messages
/// to a [`MessageHandler`] and sends replies and notifications back out.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Start receiving messages.
    ///
    /// Every inbound message is handed to `handler`. Returns when the transport shuts down.
    async fn start(&self, handler: MessageHandler) -> Void;

    /// Send a text message to a chat.
    ///
    /// Returns the id of the sent message, which conversations use to correlate replies.
    async fn send_message(&self, chat_id: ChatId, text: &str, markup: Option<ReplyMarkup>) -> Res<MessageId>;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
