//! `/start`: greets the sender by name.

use async_trait::async_trait;
use tracing::instrument;

use crate::{
    base::{
        replies,
        types::{Message, Outbound, ProcessResult, Res},
    },
    service::chat::ChatClient,
};

use super::{MessageProcessor, START_COMMAND, send_reply};

pub struct StartProcessor {
    chat: ChatClient,
}

impl StartProcessor {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl MessageProcessor for StartProcessor {
    fn name(&self) -> &'static str {
        "start"
    }

    fn is_relevant(&self, message: &Message) -> Res<bool> {
        Ok(message.has_command(START_COMMAND))
    }

    #[instrument(skip_all)]
    async fn process(&mut self, message: &Message) -> Res<ProcessResult> {
        let reply = Outbound::text(replies::greeting(&message.sender.display_name));
        send_reply(&self.chat, message.sender.id, &reply).await?;

        Ok(ProcessResult::finished())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::processor::testing::{message, recording_chat};

    #[tokio::test]
    async fn test_start_greets_sender() {
        let (recorder, chat) = recording_chat();
        let mut processor = StartProcessor::new(chat);
        let message = message(5, "/start");

        assert!(processor.is_relevant(&message).unwrap());
        assert!(processor.process(&message).await.unwrap().is_final);

        let last = recorder.last();
        assert_eq!(last.chat_id, 5);
        assert!(last.text.contains("Ada"));
    }
}
