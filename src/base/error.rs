//! Typed errors.
//!
//! [`SubscriptionError`] carries the expected outcomes of subscriber operations; processors turn them into
//! replies. [`BotError`] is for configuration mistakes and broken invariants; these propagate out of message
//! handling, get logged, and the message is dropped without a reply.

use thiserror::Error;

use super::types::ChatId;

/// Outcomes of subscriber store operations other than success.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The chat is already subscribed.
    #[error("Subscriber with chat id `{0}` already exists.")]
    AlreadyExists(ChatId),

    /// The chat is not subscribed.
    #[error("Subscriber with chat id `{0}` not found.")]
    NotFound(ChatId),

    /// The provided subscription key does not match.
    #[error("Invalid subscription key.")]
    NotAllowed,

    /// The store failed to carry out the operation.
    #[error("Subscriber operation failed: {0}")]
    Operation(String),

    /// Anything else; never turned into a reply.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

/// Configuration and invariant errors.
#[derive(Debug, Error)]
pub enum BotError {
    /// Group chat commands need the bot handle to be configured.
    #[error("The bot name must be provided for it to accept commands from group chats.")]
    MissingBotName,

    /// The filter chain was wired incorrectly.
    #[error("Invalid filter chain: {0}")]
    FilterChain(String),

    /// A processor was used in a state that does not allow it.
    #[error("Invalid processor state: {0}")]
    InvalidState(&'static str),
}
