//! Fallback for commands nothing else handles.

use async_trait::async_trait;
use tracing::instrument;

use crate::{
    base::{
        replies,
        types::{Message, Outbound, ProcessResult, Res},
    },
    service::chat::ChatClient,
};

use super::{MessageProcessor, send_reply};

pub struct UnsupportedProcessor {
    chat: ChatClient,
}

impl UnsupportedProcessor {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl MessageProcessor for UnsupportedProcessor {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn is_relevant(&self, _message: &Message) -> Res<bool> {
        Ok(true)
    }

    #[instrument(skip_all)]
    async fn process(&mut self, message: &Message) -> Res<ProcessResult> {
        send_reply(&self.chat, message.sender.id, &Outbound::text(replies::UNSUPPORTED_COMMAND)).await?;

        Ok(ProcessResult::finished())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::processor::testing::{message, recording_chat};

    #[tokio::test]
    async fn test_unsupported_matches_anything() {
        let (recorder, chat) = recording_chat();
        let mut processor = UnsupportedProcessor::new(chat);
        let message = message(3, "/weather");

        assert!(processor.is_relevant(&message).unwrap());
        assert!(processor.process(&message).await.unwrap().is_final);
        assert_eq!(recorder.last().text, replies::UNSUPPORTED_COMMAND);
    }
}
