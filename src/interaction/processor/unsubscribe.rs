//! `/unsubscribe`: removes the chat from the subscribers.

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::{
    base::{
        error::SubscriptionError,
        replies,
        types::{Message, Outbound, ProcessResult, Res},
    },
    service::{chat::ChatClient, subscription::SubscriptionService},
};

use super::{MessageProcessor, UNSUBSCRIBE_COMMAND, send_reply};

pub struct UnsubscribeProcessor {
    chat: ChatClient,
    subscriptions: SubscriptionService,
}

impl UnsubscribeProcessor {
    pub fn new(chat: ChatClient, subscriptions: SubscriptionService) -> Self {
        Self { chat, subscriptions }
    }
}

#[async_trait]
impl MessageProcessor for UnsubscribeProcessor {
    fn name(&self) -> &'static str {
        "unsubscribe"
    }

    fn is_relevant(&self, message: &Message) -> Res<bool> {
        Ok(message.has_command(UNSUBSCRIBE_COMMAND))
    }

    #[instrument(skip_all, fields(chat_id = message.sender.id))]
    async fn process(&mut self, message: &Message) -> Res<ProcessResult> {
        let text = match self.subscriptions.remove_subscriber(message.sender.id).await {
            Ok(()) => replies::UNSUBSCRIBED,
            Err(SubscriptionError::NotFound(_)) => replies::NOT_SUBSCRIBED,
            Err(SubscriptionError::Operation(e)) => {
                warn!("Failed to remove subscriber: {}", e);
                replies::UNSUBSCRIBE_FAILED
            }
            Err(e) => return Err(e.into()),
        };

        send_reply(&self.chat, message.sender.id, &Outbound::text(text)).await?;

        Ok(ProcessResult::finished())
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

    #[tokio::test]
    async fn test_unsubscribe_removes_subscriber() {
        let (recorder, chat) = recording_chat();
        let subscriptions = SubscriptionService::new(DbClient::surreal_memory().await.unwrap(), None);
        subscriptions.add_subscriber(8, "").await.unwrap();

        let mut processor = UnsubscribeProcessor::new(chat, subscriptions.clone());
        let message = message(8, "/unsubscribe");

        assert!(processor.is_relevant(&message).unwrap());
        assert!(processor.process(&message).await.unwrap().is_final);
        assert_eq!(recorder.last().text, replies::UNSUBSCRIBED);
        assert!(subscriptions.get_subscribers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_when_not_subscribed() {
        let (recorder, chat) = recording_chat();
        let subscriptions = SubscriptionService::new(DbClient::surreal_memory().await.unwrap(), None);

        let mut processor = UnsubscribeProcessor::new(chat, subscriptions);
        processor.process(&message(8, "/unsubscribe")).await.unwrap();

        assert_eq!(recorder.last().text, replies::NOT_SUBSCRIBED);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_not_relevant_to_subscribe() {
        let (_, chat) = recording_chat();
        let db = DbClient::surreal_memory().await.unwrap();
        let processor = UnsubscribeProcessor::new(chat, SubscriptionService::new(db, None));

        assert!(!processor.is_relevant(&message(8, "/subscribe")).unwrap());
    }
}
