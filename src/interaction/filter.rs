//! The filter chain that decides whether an inbound message is handled at all.
//!
//! Each filter either settles the message ([`FiltrationResult::Process`] / [`FiltrationResult::Ignore`]) or
//! names the filter to run next. The standard chain is:
//!
//! ```text
//! MessageType -> ChatType -> PendingConversation -+-(private)-> ContainsCommand
//!                                                 +-(group)---> BotMention -> ContainsCommand
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::base::{
    error::BotError,
    types::{ChatKind, EntityKind, RawMessage, Res},
};

use super::storage::ProcessorStorage;

// Types.

/// Identifies a filter within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    MessageType,
    ChatType,
    PendingConversation,
    BotMention,
    ContainsCommand,
}

/// What a filter decided about a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiltrationResult {
    /// Hand the message to the processors.
    Process,
    /// Drop the message.
    Ignore,
    /// Run the named filter next.
    Continue(FilterKind),
}

// Traits.

/// A single filter in the chain.
pub trait MessageFilter: Send + Sync + 'static {
    fn kind(&self) -> FilterKind;

    /// Every kind this filter may continue to; checked when the chain is assembled.
    fn successors(&self) -> &'static [FilterKind];

    fn filter(&self, message: &RawMessage) -> Res<FiltrationResult>;
}

// Filters.

/// Drops anything that is not a non-empty text message.
pub struct MessageTypeFilter;

impl MessageFilter for MessageTypeFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::MessageType
    }

    fn successors(&self) -> &'static [FilterKind] {
        &[FilterKind::ChatType]
    }

    fn filter(&self, message: &RawMessage) -> Res<FiltrationResult> {
        match message.text() {
            Some(text) if !text.trim().is_empty() => Ok(FiltrationResult::Continue(FilterKind::ChatType)),
            _ => Ok(FiltrationResult::Ignore),
        }
    }
}

/// Only private chats and basic groups are served.
pub struct ChatTypeFilter;

impl MessageFilter for ChatTypeFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::ChatType
    }

    fn successors(&self) -> &'static [FilterKind] {
        &[FilterKind::PendingConversation]
    }

    fn filter(&self, message: &RawMessage) -> Res<FiltrationResult> {
        match message.chat.kind {
            ChatKind::Private | ChatKind::Group => Ok(FiltrationResult::Continue(FilterKind::PendingConversation)),
            ChatKind::Supergroup | ChatKind::Channel => Ok(FiltrationResult::Ignore),
        }
    }
}

/// Lets replies to a pending conversation through even though they carry no command.
pub struct PendingConversationFilter {
    storage: ProcessorStorage,
}

impl PendingConversationFilter {
    pub fn new(storage: ProcessorStorage) -> Self {
        Self { storage }
    }
}

impl MessageFilter for PendingConversationFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::PendingConversation
    }

    fn successors(&self) -> &'static [FilterKind] {
        &[FilterKind::ContainsCommand, FilterKind::BotMention]
    }

    fn filter(&self, message: &RawMessage) -> Res<FiltrationResult> {
        if self.storage.is_relevant_to_any(&message.to_message())? {
            return Ok(FiltrationResult::Process);
        }

        match message.chat.kind {
            ChatKind::Private => Ok(FiltrationResult::Continue(FilterKind::ContainsCommand)),
            _ => Ok(FiltrationResult::Continue(FilterKind::BotMention)),
        }
    }
}

/// In groups, only messages addressed to the bot are handled: either a mention or a `/command@bot`.
pub struct BotMentionFilter {
    bot_name: Option<String>,
}

impl BotMentionFilter {
    /// `bot_name` is the handle with its leading `@`.
    pub fn new(bot_name: Option<String>) -> Self {
        Self { bot_name }
    }
}

impl MessageFilter for BotMentionFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::BotMention
    }

    fn successors(&self) -> &'static [FilterKind] {
        &[FilterKind::ContainsCommand]
    }

    fn filter(&self, message: &RawMessage) -> Res<FiltrationResult> {
        if message.chat.kind == ChatKind::Private {
            return Ok(FiltrationResult::Continue(FilterKind::ContainsCommand));
        }

        let bot_name = self.bot_name.as_deref().ok_or(BotError::MissingBotName)?;

        let mentioned = message.entities_of(EntityKind::Mention).any(|e| e.value.eq_ignore_ascii_case(bot_name));
        let addressed = message.entities_of(EntityKind::BotCommand).any(|e| e.value.split_once('@').is_some_and(|(_, name)| format!("@{name}").eq_ignore_ascii_case(bot_name)));

        if mentioned || addressed {
            Ok(FiltrationResult::Continue(FilterKind::ContainsCommand))
        } else {
            Ok(FiltrationResult::Ignore)
        }
    }
}

/// Requires at least one command entity.
pub struct ContainsCommandFilter;

impl MessageFilter for ContainsCommandFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::ContainsCommand
    }

    fn successors(&self) -> &'static [FilterKind] {
        &[]
    }

    fn filter(&self, message: &RawMessage) -> Res<FiltrationResult> {
        if message.entities_of(EntityKind::BotCommand).next().is_some() {
            Ok(FiltrationResult::Process)
        } else {
            Ok(FiltrationResult::Ignore)
        }
    }
}

// Chain.

/// An assembled filter chain; evaluation always starts at the first filter.
pub struct FilterChain {
    filters: Vec<Box<dyn MessageFilter>>,
    index: HashMap<FilterKind, usize>,
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.filters.iter().map(|filter| filter.kind())).finish()
    }
}

impl FilterChain {
    /// Assembles a chain, checking that every declared successor exists and no kind appears twice.
    pub fn new(filters: Vec<Box<dyn MessageFilter>>) -> Result<Self, BotError> {
        if filters.is_empty() {
            return Err(BotError::FilterChain("the chain has no filters".to_string()));
        }

        let mut index = HashMap::with_capacity(filters.len());
        for (position, filter) in filters.iter().enumerate() {
            if index.insert(filter.kind(), position).is_some() {
                return Err(BotError::FilterChain(format!("duplicate filter `{:?}`", filter.kind())));
            }
        }

        for filter in &filters {
            for successor in filter.successors() {
                if *successor == filter.kind() {
                    return Err(BotError::FilterChain(format!("filter `{:?}` continues to itself", filter.kind())));
                }

                if !index.contains_key(successor) {
                    return Err(BotError::FilterChain(format!("filter `{:?}` continues to missing filter `{:?}`", filter.kind(), successor)));
                }
            }
        }

        Ok(Self { filters, index })
    }

    /// The chain used by the bot.
    pub fn standard(storage: ProcessorStorage, bot_name: Option<String>) -> Result<Self, BotError> {
        Self::new(vec![
            Box::new(MessageTypeFilter),
            Box::new(ChatTypeFilter),
            Box::new(PendingConversationFilter::new(storage)),
            Box::new(BotMentionFilter::new(bot_name)),
            Box::new(ContainsCommandFilter),
        ])
    }

    /// Runs the chain; the result is always [`FiltrationResult::Process`] or [`FiltrationResult::Ignore`].
    pub fn filter(&self, message: &RawMessage) -> Res<FiltrationResult> {
        let mut current = &self.filters[0];

        // A chain never visits a filter twice.
        for _ in 0..self.filters.len() {
            match current.filter(message)? {
                FiltrationResult::Continue(next) => {
                    let position = self.index.get(&next).ok_or_else(|| BotError::FilterChain(format!("missing filter `{next:?}`")))?;
                    current = &self.filters[*position];
                }
                result => {
                    debug!("Filter `{:?}` settled the message: {:?}.", current.kind(), result);
                    return Ok(result);
                }
            }
        }

        Err(BotError::FilterChain("the chain did not settle the message".to_string()).into())
    }
}

// Tests.
