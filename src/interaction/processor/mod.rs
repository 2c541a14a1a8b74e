//! Message processors.
//!
//! A processor decides whether a message belongs to it ([`MessageProcessor::is_relevant`]) and handles it
//! ([`MessageProcessor::process`]), sending exactly one reply. Single-shot commands always finish; the
//! subscribe processor may ask for a follow-up message and stay alive between messages.

pub mod help;
pub mod start;
pub mod subscribe;
pub mod unsubscribe;
pub mod unsupported;

use async_trait::async_trait;

use crate::{
    base::types::{ChatId, Message, Outbound, ProcessResult, Res, SentMessage},
    service::chat::ChatClient,
};

// Commands.

pub const HELP_COMMAND: &str = "/help";
pub const START_COMMAND: &str = "/start";
pub const SUBSCRIBE_COMMAND: &str = "/subscribe";
pub const UNSUBSCRIBE_COMMAND: &str = "/unsubscribe";

/// A command and what it does, as listed by `/help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescription {
    pub name: &'static str,
    pub description: &'static str,
}

impl std::fmt::Display for CommandDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// All supported commands.
pub const COMMANDS: &[CommandDescription] = &[
    CommandDescription { name: HELP_COMMAND, description: "Show the list of available commands." },
    CommandDescription { name: START_COMMAND, description: "Say hello to the bot." },
    CommandDescription { name: SUBSCRIBE_COMMAND, description: "Subscribe this chat to Rocket.Chat notifications." },
    CommandDescription { name: UNSUBSCRIBE_COMMAND, description: "Stop receiving Rocket.Chat notifications in this chat." },
];

// Traits.

/// A handler for one kind of message.
#[async_trait]
pub trait MessageProcessor: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// The chat whose conversation this processor holds, if it holds one.
    ///
    /// Only stateful processors return a chat; storage keeps at most one of them per chat.
    fn conversation_chat(&self) -> Option<ChatId> {
        None
    }

    /// Whether the message belongs to this processor. Never mutates state.
    fn is_relevant(&self, message: &Message) -> Res<bool>;

    /// Handles the message and sends the reply.
    async fn process(&mut self, message: &Message) -> Res<ProcessResult>;
}

/// An owned, type-erased processor.
pub type BoxedProcessor = Box<dyn MessageProcessor>;

/// Sends a reply to the given chat and returns what was sent.
pub async fn send_reply(chat: &ChatClient, chat_id: ChatId, reply: &Outbound) -> Res<SentMessage> {
    let id = chat.send_message(chat_id, &reply.text, reply.markup).await?;

    Ok(SentMessage {
        id,
        chat_id,
        text: reply.text.clone(),
    })
}

// Tests.
