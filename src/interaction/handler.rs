//! Entry point for inbound messages: filter, normalize, route.

use std::sync::Arc;

use tracing::{Instrument, debug, error, info, instrument};

use crate::base::types::{ProcessResult, RawMessage, Res};

use super::{
    filter::{FilterChain, FiltrationResult},
    invoker::ProcessorInvoker,
};

/// What happened to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// The message was dropped without a reply.
    Ignored,
    /// A processor handled the message.
    Processed(ProcessResult),
}

/// Message handler shared with the chat transport. Trivially cloneable.
#[derive(Clone)]
pub struct MessageHandler {
    filters: Arc<FilterChain>,
    invoker: ProcessorInvoker,
}

impl MessageHandler {
    pub fn new(filters: FilterChain, invoker: ProcessorInvoker) -> Self {
        Self {
            filters: Arc::new(filters),
            invoker,
        }
    }

    /// Handles the message on its own task.
    ///
    /// Errors are logged and the message is dropped without a reply.
    #[instrument(skip_all)]
    pub fn dispatch(&self, message: RawMessage) {
        let handler = self.clone();

        tokio::spawn(async move {
            // Process the message.
            let result = handler.handle(message).in_current_span().await;

            // Log any errors.
            if let Err(err) = &result {
                error!("Error while handling: {}", err);
            }
        });
    }

    /// Runs the filter chain and, if the message passes, routes it to a processor.
    #[instrument(skip_all, fields(chat_id = message.chat.id, message_id = message.id))]
    pub async fn handle(&self, message: RawMessage) -> Res<Handled> {
        info!("Chat: `{}` ({:?}), user: {:?}. Message: {:?}", message.chat.id, message.chat.kind, message.from_username.as_deref().unwrap_or("unknown"), message.text().unwrap_or_default());

        if self.filters.filter(&message)? == FiltrationResult::Ignore {
            debug!("Message ignored.");
            return Ok(Handled::Ignored);
        }

        match self.invoker.route(&message.to_message()).await? {
            Some(result) => Ok(Handled::Processed(result)),
            None => Ok(Handled::Ignored),
        }
    }
}

// Tests.
