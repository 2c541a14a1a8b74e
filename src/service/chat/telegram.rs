//! Telegram implementation of the chat service.
//!
//! Receives updates by long polling through a `teloxide` dispatcher and converts every message into
//! the transport-neutral [`RawMessage`] before handing it to the [`MessageHandler`].

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{ForceReply, MessageEntityKind},
};
use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{self, ChatKind, Entity, EntityKind, MessageContent, RawChat, RawMessage, ReplyMarkup, Res, Void},
    },
    interaction::handler::MessageHandler,
};

use super::{ChatClient, GenericChatClient};

// Extra methods on `ChatClient` applied by the telegram implementation.

impl ChatClient {
    /// Creates a new Telegram chat client.
    pub async fn telegram(config: &Config) -> Res<Self> {
        let client = TelegramChatClient::new(config).await?;
        Ok(Self::new(Arc::new(client)))
    }
}

// Structs.

/// Telegram client implementation.
#[derive(Clone)]
struct TelegramChatClient {
    bot: Bot,
}

impl TelegramChatClient {
    /// Create a new Telegram chat client and verify the token.
    #[instrument(name = "TelegramChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        let bot = Bot::new(config.telegram_bot_token.clone());

        // Verify the token and check the configured bot name against the real one.

        let me = bot.get_me().await.map_err(|e| anyhow::anyhow!("Invalid Telegram bot token: {}", e))?;
        let actual_name = format!("@{}", me.username());

        info!("Telegram bot user: {}", actual_name);

        match config.bot_name() {
            Some(configured) if !configured.eq_ignore_ascii_case(&actual_name) => {
                warn!("Configured bot name `{}` does not match the actual bot name `{}`.", configured, actual_name);
            }
            None => warn!("No bot name configured; commands from group chats will be dropped."),
            _ => {}
        }

        Ok(Self { bot })
    }
}

#[async_trait]
impl GenericChatClient for TelegramChatClient {
    async fn start(&self, handler: MessageHandler) -> Void {
        info!("Starting Telegram polling ...");

        let tree = Update::filter_message().endpoint(move |msg: Message| {
            let handler = handler.clone();

            async move {
                handler.dispatch(to_raw_message(&msg));
                respond(())
            }
        });

        Dispatcher::builder(self.bot.clone(), tree)
            .default_handler(|upd| async move {
                tracing::debug!("Unhandled update: {:?}", upd.kind);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram polling stopped.");

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, chat_id: types::ChatId, text: &str, markup: Option<ReplyMarkup>) -> Res<types::MessageId> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);

        if let Some(ReplyMarkup::ForceReply) = markup {
            request = request.reply_markup(ForceReply::new());
        }

        let sent = request.await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(sent.id.0)
    }
}

// Conversion.

/// Converts a Telegram message into a [`RawMessage`].
fn to_raw_message(msg: &Message) -> RawMessage {
    let kind = if msg.chat.is_private() {
        ChatKind::Private
    } else if msg.chat.is_channel() {
        ChatKind::Channel
    } else if msg.chat.is_supergroup() {
        ChatKind::Supergroup
    } else {
        ChatKind::Group
    };

    let content = match msg.text() {
        Some(text) => {
            let entities = msg
                .parse_entities()
                .unwrap_or_default()
                .iter()
                .map(|entity| {
                    let kind = match entity.kind() {
                        MessageEntityKind::BotCommand => EntityKind::BotCommand,
                        MessageEntityKind::Mention => EntityKind::Mention,
                        _ => EntityKind::Other,
                    };

                    Entity::new(kind, entity.text())
                })
                .collect();

            MessageContent::Text { text: text.to_string(), entities }
        }
        None => MessageContent::Other,
    };

    RawMessage {
        id: msg.id.0,
        chat: RawChat {
            id: msg.chat.id.0,
            kind,
            title: msg.chat.title().map(str::to_string),
            first_name: msg.chat.first_name().map(str::to_string),
        },
        from_username: msg.from.as_ref().and_then(|u| u.username.clone()),
        content,
        reply_to: msg.reply_to_message().map(|m| m.id.0),
    }
}
