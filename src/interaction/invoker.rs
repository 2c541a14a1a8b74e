//! Routes a filtered message to its processor.

use tracing::{debug, info, instrument};

use crate::base::types::{Message, ProcessResult, Res};

use super::{factory::ProcessorFactory, storage::ProcessorStorage};

/// Processor invoker. Trivially cloneable.
#[derive(Clone)]
pub struct ProcessorInvoker {
    storage: ProcessorStorage,
    factory: ProcessorFactory,
}

impl ProcessorInvoker {
    pub fn new(storage: ProcessorStorage, factory: ProcessorFactory) -> Self {
        Self { storage, factory }
    }

    /// Resumes the pending conversation the message belongs to, or starts a new processor, and stores it
    /// again if it expects more messages.
    ///
    /// Returns `None` when the message is dropped: it has no command and no pending conversation claims it
    /// (the conversation expired or was taken by another message after filtering).
    #[instrument(skip_all, fields(chat_id = message.sender.id, message_id = message.id))]
    pub async fn route(&self, message: &Message) -> Res<Option<ProcessResult>> {
        let mut processor = match self.storage.take_relevant(message)? {
            Some(processor) => {
                debug!("Resuming pending `{}` processor.", processor.name());
                processor
            }
            None if message.command_tokens().next().is_none() => {
                info!("No pending conversation for message {:?}; dropping it.", message.text);
                return Ok(None);
            }
            None => self.factory.create(message)?,
        };

        let result = processor.process(message).await?;

        if !result.is_final {
            self.storage.store(processor)?;
        }

        Ok(Some(result))
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        base::{replies, types::ReplyMarkup},
        interaction::processor::testing::{message, recording_chat, reply},
        service::{db::DbClient, subscription::SubscriptionService},
    };

    #[tokio::test]
    async fn test_key_flow_stores_then_releases() {
        let (recorder, chat) = recording_chat();
        let subscriptions = SubscriptionService::new(DbClient::surreal_memory().await.unwrap(), Some("s3cret".into()));
        let storage = ProcessorStorage::new(None);
        let invoker = ProcessorInvoker::new(storage.clone(), ProcessorFactory::new(chat, subscriptions));

        assert!(!invoker.route(&message(1, "/subscribe")).await.unwrap().unwrap().is_final);
        assert_eq!(storage.len().unwrap(), 1);

        let prompt = recorder.last();
        assert_eq!(prompt.markup, Some(ReplyMarkup::ForceReply));

        assert!(invoker.route(&reply(1, "s3cret", prompt.id)).await.unwrap().unwrap().is_final);
        assert_eq!(recorder.last().text, replies::SUBSCRIBED);
        assert!(storage.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_single_shot_commands_are_not_stored() {
        let (recorder, chat) = recording_chat();
        let subscriptions = SubscriptionService::new(DbClient::surreal_memory().await.unwrap(), None);
        let storage = ProcessorStorage::new(None);
        let invoker = ProcessorInvoker::new(storage.clone(), ProcessorFactory::new(chat, subscriptions));

        for text in ["/help", "/start", "/subscribe", "/unsubscribe", "/nope"] {
            assert!(invoker.route(&message(1, text)).await.unwrap().unwrap().is_final);
        }

        assert_eq!(recorder.sent().len(), 5);
        assert!(storage.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_plain_text_without_conversation_is_dropped() {
        let (recorder, chat) = recording_chat();
        let subscriptions = SubscriptionService::new(DbClient::surreal_memory().await.unwrap(), Some("s3cret".into()));
        let storage = ProcessorStorage::new(None);
        let invoker = ProcessorInvoker::new(storage.clone(), ProcessorFactory::new(chat, subscriptions));

        invoker.route(&message(1, "/subscribe")).await.unwrap();
        let prompt = recorder.last();

        // The conversation is gone by the time the key arrives.
        assert!(storage.take_relevant(&reply(1, "s3cret", prompt.id)).unwrap().is_some());

        assert_eq!(invoker.route(&reply(1, "s3cret", prompt.id)).await.unwrap(), None);
        assert_eq!(recorder.sent().len(), 1);
        assert!(storage.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_unrelated_message_does_not_resume_conversation() {
        let (recorder, chat) = recording_chat();
        let subscriptions = SubscriptionService::new(DbClient::surreal_memory().await.unwrap(), Some("s3cret".into()));
        let storage = ProcessorStorage::new(None);
        let invoker = ProcessorInvoker::new(storage.clone(), ProcessorFactory::new(chat, subscriptions));

        invoker.route(&message(1, "/subscribe")).await.unwrap();
        invoker.route(&message(1, "/help")).await.unwrap();

        assert!(recorder.last().text.starts_with("/help: "));
        assert_eq!(storage.len().unwrap(), 1);
    }
}
