//! `/help`: lists the supported commands.

use async_trait::async_trait;
use tracing::instrument;

use crate::{
    base::types::{Message, Outbound, ProcessResult, Res},
    service::chat::ChatClient,
};

use super::{COMMANDS, HELP_COMMAND, MessageProcessor, send_reply};

pub struct HelpProcessor {
    chat: ChatClient,
}

impl HelpProcessor {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }

    /// One line per command, `/name: description`.
    pub fn help_text() -> String {
        COMMANDS.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    }
}

#[async_trait]
impl MessageProcessor for HelpProcessor {
    fn name(&self) -> &'static str {
        "help"
    }

    fn is_relevant(&self, message: &Message) -> Res<bool> {
        Ok(message.has_command(HELP_COMMAND))
    }

    #[instrument(skip_all)]
    async fn process(&mut self, message: &Message) -> Res<ProcessResult> {
        send_reply(&self.chat, message.sender.id, &Outbound::text(Self::help_text())).await?;

        Ok(ProcessResult::finished())
    }
}

// Tests.
