//! `/subscribe`: the only multi-message conversation.
//!
//! Without a configured secret the chat is subscribed right away. With one, the bot asks for the key using a
//! force-reply prompt and waits for a direct reply to that prompt; exactly one attempt is made with whatever
//! the reply contains.
//!
//! ```text
//! Initial --(no key needed)--> Complete
//! Initial --(key needed)-----> Verify --(any reply to the prompt)--> Complete
//! ```

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::{
    base::{
        error::{BotError, SubscriptionError},
        replies,
        types::{ChatId, Message, Outbound, ProcessResult, Res, SentMessage},
    },
    service::{chat::ChatClient, subscription::SubscriptionService},
};

use super::{MessageProcessor, SUBSCRIBE_COMMAND, send_reply};

// Types.

/// State of a subscribe conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeState {
    /// Waiting for the `/subscribe` command.
    Initial,
    /// Waiting for a reply carrying the subscription key.
    Verify,
    /// Done; never relevant again.
    Complete,
}

impl SubscribeState {
    pub fn is_final(self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// The last exchange of a conversation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub last_inbound: Option<Message>,
    pub last_outbound: Option<SentMessage>,
}

/// The outcome of handling one message: the state to move to and the reply to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SubscribeState,
    pub reply: Outbound,
}

impl Transition {
    fn complete(text: &str) -> Self {
        Self {
            next: SubscribeState::Complete,
            reply: Outbound::text(text),
        }
    }
}

// Structs.

/// Stateful processor driving a subscribe conversation.
pub struct SubscribeProcessor {
    chat: ChatClient,
    subscriptions: SubscriptionService,
    state: SubscribeState,
    context: Context,
}

impl SubscribeProcessor {
    pub fn new(chat: ChatClient, subscriptions: SubscriptionService) -> Self {
        Self {
            chat,
            subscriptions,
            state: SubscribeState::Initial,
            context: Context::default(),
        }
    }

    pub fn state(&self) -> SubscribeState {
        self.state
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Works out the next state and reply for `message` without sending anything.
    pub async fn transition(&self, message: &Message) -> Res<Transition> {
        match self.state {
            SubscribeState::Initial => self.begin(message).await,
            SubscribeState::Verify => self.verify(message).await,
            SubscribeState::Complete => Err(BotError::InvalidState("a completed subscription cannot process messages").into()),
        }
    }

    async fn begin(&self, message: &Message) -> Res<Transition> {
        if self.subscriptions.is_secret_key_required() {
            return Ok(Transition {
                next: SubscribeState::Verify,
                reply: Outbound::force_reply(replies::SUBSCRIPTION_KEY_REQUEST),
            });
        }

        let text = match self.subscriptions.add_subscriber(message.sender.id, "").await {
            Ok(()) => replies::SUBSCRIBED,
            Err(SubscriptionError::AlreadyExists(_)) => replies::ALREADY_SUBSCRIBED,
            Err(SubscriptionError::Operation(e)) => {
                warn!("Failed to add subscriber: {}", e);
                replies::SUBSCRIBE_FAILED
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Transition::complete(text))
    }

    async fn verify(&self, message: &Message) -> Res<Transition> {
        let text = match self.subscriptions.add_subscriber(message.sender.id, &message.text).await {
            Ok(()) => replies::SUBSCRIBED,
            Err(SubscriptionError::AlreadyExists(_)) => replies::ALREADY_SUBSCRIBED,
            Err(SubscriptionError::NotAllowed) => replies::SUBSCRIBE_INVALID_KEY,
            Err(SubscriptionError::Operation(e)) => {
                warn!("Failed to add subscriber: {}", e);
                replies::SUBSCRIBE_FAILED
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Transition::complete(text))
    }
}

#[async_trait]
impl MessageProcessor for SubscribeProcessor {
    fn name(&self) -> &'static str {
        "subscribe"
    }

    fn conversation_chat(&self) -> Option<ChatId> {
        self.context.last_outbound.as_ref().map(|sent| sent.chat_id)
    }

    fn is_relevant(&self, message: &Message) -> Res<bool> {
        match self.state {
            SubscribeState::Initial => Ok(message.has_command(SUBSCRIBE_COMMAND)),
            SubscribeState::Verify => {
                let prompt = self.context.last_outbound.as_ref().ok_or(BotError::InvalidState("no key request was recorded for the pending subscription"))?;

                // Message ids are only unique within a chat.
                Ok(message.sender.id == prompt.chat_id && message.reply_target.is_some_and(|target| target.source_message_id == prompt.id))
            }
            SubscribeState::Complete => Ok(false),
        }
    }

    #[instrument(skip_all, fields(chat_id = message.sender.id))]
    async fn process(&mut self, message: &Message) -> Res<ProcessResult> {
        let Transition { next, reply } = self.transition(message).await?;

        let sent = send_reply(&self.chat, message.sender.id, &reply).await?;

        info!("Subscription moved from {:?} to {:?}.", self.state, next);

        self.state = next;
        self.context.last_inbound = Some(message.clone());
        self.context.last_outbound = Some(sent);

        Ok(ProcessResult { is_final: next.is_final() })
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        base::types::ReplyMarkup,
        interaction::processor::testing::{message, recording_chat, reply},
        service::db::{DbClient, Subscriber},
    };

    async fn service(secret: Option<&str>) -> SubscriptionService {
        SubscriptionService::new(DbClient::surreal_memory().await.unwrap(), secret.map(str::to_string))
    }

    #[tokio::test]
    async fn test_subscribe_without_key_completes_immediately() {
        let (recorder, chat) = recording_chat();
        let subscriptions = service(None).await;
        let mut processor = SubscribeProcessor::new(chat, subscriptions.clone());
        let message = message(1, "/subscribe");

        assert!(processor.is_relevant(&message).unwrap());
        assert!(processor.process(&message).await.unwrap().is_final);
        assert_eq!(processor.state(), SubscribeState::Complete);
        assert_eq!(recorder.last().text, replies::SUBSCRIBED);
        assert_eq!(subscriptions.get_subscribers().await.unwrap(), vec![Subscriber::new(1)]);
    }

    #[tokio::test]
    async fn test_subscribe_twice_reports_existing_subscription() {
        let (recorder, chat) = recording_chat();
        let subscriptions = service(None).await;
        subscriptions.add_subscriber(1, "").await.unwrap();

        let mut processor = SubscribeProcessor::new(chat, subscriptions);

        assert!(processor.process(&message(1, "/subscribe")).await.unwrap().is_final);
        assert_eq!(recorder.last().text, replies::ALREADY_SUBSCRIBED);
    }

    #[tokio::test]
    async fn test_subscribe_with_key_asks_for_reply() {
        let (recorder, chat) = recording_chat();
        let mut processor = SubscribeProcessor::new(chat, service(Some("s3cret")).await);

        let result = processor.process(&message(1, "/subscribe")).await.unwrap();

        assert!(!result.is_final);
        assert_eq!(processor.state(), SubscribeState::Verify);

        let prompt = recorder.last();
        assert_eq!(prompt.text, replies::SUBSCRIPTION_KEY_REQUEST);
        assert_eq!(prompt.markup, Some(ReplyMarkup::ForceReply));
        assert_eq!(processor.context().last_outbound.as_ref().map(|s| s.id), Some(prompt.id));
        assert_eq!(processor.conversation_chat(), Some(1));
    }

    #[tokio::test]
    async fn test_verify_only_accepts_reply_to_prompt() {
        let (recorder, chat) = recording_chat();
        let mut processor = SubscribeProcessor::new(chat, service(Some("s3cret")).await);
        processor.process(&message(1, "/subscribe")).await.unwrap();
        let prompt = recorder.last();

        assert!(!processor.is_relevant(&message(1, "s3cret")).unwrap());
        assert!(!processor.is_relevant(&reply(1, "s3cret", prompt.id + 1)).unwrap());
        assert!(!processor.is_relevant(&reply(2, "s3cret", prompt.id)).unwrap());
        assert!(processor.is_relevant(&reply(1, "s3cret", prompt.id)).unwrap());
        assert_eq!(processor.state(), SubscribeState::Verify);
    }

    #[tokio::test]
    async fn test_verify_with_correct_key_subscribes() {
        let (recorder, chat) = recording_chat();
        let subscriptions = service(Some("s3cret")).await;
        let mut processor = SubscribeProcessor::new(chat, subscriptions.clone());
        processor.process(&message(1, "/subscribe")).await.unwrap();
        let prompt = recorder.last();

        let result = processor.process(&reply(1, "s3cret", prompt.id)).await.unwrap();

        assert!(result.is_final);
        assert_eq!(recorder.last().text, replies::SUBSCRIBED);
        assert_eq!(subscriptions.get_subscribers().await.unwrap(), vec![Subscriber::new(1)]);
    }

    #[tokio::test]
    async fn test_verify_with_wrong_key_completes_without_retry() {
        let (recorder, chat) = recording_chat();
        let subscriptions = service(Some("s3cret")).await;
        let mut processor = SubscribeProcessor::new(chat, subscriptions.clone());
        processor.process(&message(1, "/subscribe")).await.unwrap();
        let prompt = recorder.last();

        let result = processor.process(&reply(1, "guess", prompt.id)).await.unwrap();

        assert!(result.is_final);
        assert_eq!(recorder.last().text, replies::SUBSCRIBE_INVALID_KEY);
        assert!(subscriptions.get_subscribers().await.unwrap().is_empty());
        assert!(!processor.is_relevant(&reply(1, "s3cret", recorder.last().id)).unwrap());
    }

    #[tokio::test]
    async fn test_complete_state_rejects_processing() {
        let (recorder, chat) = recording_chat();
        let mut processor = SubscribeProcessor::new(chat, service(None).await);
        processor.process(&message(1, "/subscribe")).await.unwrap();
        let sent = recorder.sent().len();

        assert!(!processor.is_relevant(&message(1, "/subscribe")).unwrap());
        assert!(processor.process(&message(1, "/subscribe")).await.is_err());
        assert_eq!(recorder.sent().len(), sent);
    }

    #[tokio::test]
    async fn test_verify_without_recorded_prompt_is_an_error() {
        let (_, chat) = recording_chat();
        let mut processor = SubscribeProcessor::new(chat, service(Some("s3cret")).await);
        processor.state = SubscribeState::Verify;

        assert!(processor.is_relevant(&reply(1, "s3cret", 1)).is_err());
    }
}
