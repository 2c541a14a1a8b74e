//! Common types shared across the bot.
//!
//! Two message shapes live here: [`RawMessage`] is what the transport hands over (chat kind, entities,
//! content kind), and [`Message`] is the normalized form the processors work with once a message has
//! passed the filter chain.

use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Identifier of a chat; also the identity of a sender.
pub type ChatId = i64;

/// Identifier of a message within a chat.
pub type MessageId = i32;

// Raw (transport-level) messages.

/// The kind of chat a message was posted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// Chat information attached to a raw message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChat {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
    pub first_name: Option<String>,
}

/// Kind of a text entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    BotCommand,
    Mention,
    Other,
}

/// A parsed entity along with the slice of text it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub value: String,
}

impl Entity {
    pub fn new(kind: EntityKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }
}

/// Content of a raw message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    Text { text: String, entities: Vec<Entity> },
    /// Anything that is not plain text (photos, stickers, service messages, ...).
    Other,
}

/// A message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: MessageId,
    pub chat: RawChat,
    pub from_username: Option<String>,
    pub content: MessageContent,
    pub reply_to: Option<MessageId>,
}

impl RawMessage {
    /// The text of the message, if it is a text message.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text { text, .. } => Some(text),
            MessageContent::Other => None,
        }
    }

    /// All entities of the message (empty for non-text content).
    pub fn entities(&self) -> &[Entity] {
        match &self.content {
            MessageContent::Text { entities, .. } => entities,
            MessageContent::Other => &[],
        }
    }

    /// Entities of the given kind.
    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities().iter().filter(move |e| e.kind == kind)
    }

    /// Normalizes the raw message into a [`Message`].
    ///
    /// Non-text content yields an empty text; the filter chain drops such messages before this is called.
    pub fn to_message(&self) -> Message {
        let display_name = self.chat.title.clone().or_else(|| self.chat.first_name.clone()).unwrap_or_default();

        Message {
            id: self.id,
            text: self.text().unwrap_or_default().to_string(),
            sender: Sender { id: self.chat.id, display_name },
            reply_target: self.reply_to.map(|source_message_id| ReplyTarget { source_message_id }),
        }
    }
}

// Normalized messages.

/// The sender of a message (the chat it came from).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: ChatId,
    pub display_name: String,
}

/// The message a message replies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub source_message_id: MessageId,
}

/// A normalized inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub reply_target: Option<ReplyTarget>,
}

impl Message {
    /// Command tokens in the text, lowercased and stripped of any `@botname` suffix.
    pub fn command_tokens(&self) -> impl Iterator<Item = String> + '_ {
        self.text
            .split_whitespace()
            .filter(|word| word.starts_with('/') && word.len() > 1)
            .map(|word| word.split('@').next().unwrap_or(word).to_lowercase())
    }

    /// Whether the text carries the given command (e.g. `/help`).
    pub fn has_command(&self, command: &str) -> bool {
        self.command_tokens().any(|token| token == command)
    }
}

/// UI markup attached to an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyMarkup {
    /// Asks the client to open a direct reply to the sent message.
    ForceReply,
}

/// A reply the bot is about to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub text: String,
    pub markup: Option<ReplyMarkup>,
}

impl Outbound {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), markup: None }
    }

    pub fn force_reply(text: impl Into<String>) -> Self {
        Self { text: text.into(), markup: Some(ReplyMarkup::ForceReply) }
    }
}

/// A reply the bot has sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub text: String,
}

/// Outcome of a processor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessResult {
    /// When `true`, the processor is discarded instead of being stored.
    pub is_final: bool,
}

impl ProcessResult {
    pub fn finished() -> Self {
        Self { is_final: true }
    }

    pub fn pending() -> Self {
        Self { is_final: false }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: ChatKind, text: &str) -> RawMessage {
        RawMessage {
            id: 7,
            chat: RawChat { id: 42, kind, title: None, first_name: Some("Ada".into()) },
            from_username: Some("ada".into()),
            content: MessageContent::Text { text: text.into(), entities: vec![] },
            reply_to: Some(5),
        }
    }

    #[test]
    fn test_to_message_uses_chat_as_sender() {
        let message = raw(ChatKind::Private, "/start").to_message();

        assert_eq!(message.id, 7);
        assert_eq!(message.sender.id, 42);
        assert_eq!(message.sender.display_name, "Ada");
        assert_eq!(message.reply_target, Some(ReplyTarget { source_message_id: 5 }));
    }

    #[test]
    fn test_to_message_prefers_chat_title() {
        let mut raw = raw(ChatKind::Group, "/help");
        raw.chat.title = Some("Ops".into());

        assert_eq!(raw.to_message().sender.display_name, "Ops");
    }

    #[test]
    fn test_command_tokens_strip_bot_name_and_case() {
        let message = raw(ChatKind::Group, "hey /SUBSCRIBE@rocket_bot now /x").to_message();
        let tokens: Vec<_> = message.command_tokens().collect();

        assert_eq!(tokens, vec!["/subscribe".to_string(), "/x".to_string()]);
        assert!(message.has_command("/subscribe"));
        assert!(!message.has_command("/unsubscribe"));
    }

    #[test]
    fn test_unsubscribe_is_not_subscribe() {
        let message = raw(ChatKind::Private, "/unsubscribe").to_message();

        assert!(message.has_command("/unsubscribe"));
        assert!(!message.has_command("/subscribe"));
    }

    #[test]
    fn test_non_text_content_has_no_entities() {
        let mut raw = raw(ChatKind::Private, "");
        raw.content = MessageContent::Other;

        assert!(raw.text().is_none());
        assert!(raw.entities().is_empty());
    }
}
