//! Creates processors for messages that belong to no pending conversation.

use tracing::debug;

use crate::{
    base::types::{Message, Res},
    service::{chat::ChatClient, subscription::SubscriptionService},
};

use super::processor::{
    BoxedProcessor, help::HelpProcessor, start::StartProcessor, subscribe::SubscribeProcessor, unsubscribe::UnsubscribeProcessor, unsupported::UnsupportedProcessor,
};

/// Processor factory. Trivially cloneable.
#[derive(Clone)]
pub struct ProcessorFactory {
    chat: ChatClient,
    subscriptions: SubscriptionService,
}

impl ProcessorFactory {
    pub fn new(chat: ChatClient, subscriptions: SubscriptionService) -> Self {
        Self { chat, subscriptions }
    }

    /// Fresh candidates, in priority order.
    fn candidates(&self) -> Vec<BoxedProcessor> {
        vec![
            Box::new(HelpProcessor::new(self.chat.clone())),
            Box::new(StartProcessor::new(self.chat.clone())),
            Box::new(SubscribeProcessor::new(self.chat.clone(), self.subscriptions.clone())),
            Box::new(UnsubscribeProcessor::new(self.chat.clone(), self.subscriptions.clone())),
        ]
    }

    /// The first candidate relevant to the message, or the unsupported-command fallback.
    pub fn create(&self, message: &Message) -> Res<BoxedProcessor> {
        for candidate in self.candidates() {
            if candidate.is_relevant(message)? {
                debug!("Created `{}` processor.", candidate.name());
                return Ok(candidate);
            }
        }

        debug!("No processor matched; falling back to `unsupported`.");

        Ok(Box::new(UnsupportedProcessor::new(self.chat.clone())))
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        interaction::processor::testing::{message, recording_chat},
        service::db::DbClient,
    };

    async fn factory() -> ProcessorFactory {
        let (_, chat) = recording_chat();
        ProcessorFactory::new(chat, SubscriptionService::new(DbClient::surreal_memory().await.unwrap(), None))
    }

    #[tokio::test]
    async fn test_commands_map_to_processors() {
        let factory = factory().await;

        for (text, name) in [("/help", "help"), ("/START", "start"), ("/subscribe@rocket_bot", "subscribe"), ("/unsubscribe", "unsubscribe"), ("/weather", "unsupported")] {
            assert_eq!(factory.create(&message(1, text)).unwrap().name(), name, "{text}");
        }
    }

    #[tokio::test]
    async fn test_first_matching_candidate_wins() {
        let factory = factory().await;

        assert_eq!(factory.create(&message(1, "/start /help")).unwrap().name(), "help");
    }
}
