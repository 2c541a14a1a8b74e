//! Polls the watched Rocket.Chat group and notifies subscribers about new messages.
//!
//! The loop gives up after [`MAX_ERRORS`] consecutive failures on either side (Rocket.Chat reads or chat
//! sends); a success on a side resets its counter.

use std::{collections::BTreeSet, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        replies,
        types::{ChatId, Void},
    },
    service::{
        chat::ChatClient,
        db::Subscriber,
        rocket::{RocketChatClient, RocketMessage},
        subscription::SubscriptionService,
    },
};

/// Consecutive failures tolerated on each side before the loop stops.
pub const MAX_ERRORS: u32 = 10;

// Types.

/// A notification about to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub chat_id: ChatId,
    pub text: String,
}

/// Progress of the polling loop.
#[derive(Debug, Clone, Default)]
pub struct NotifierState {
    /// Timestamp of the newest message already seen; `None` until the first successful read.
    pub last_seen: Option<DateTime<Utc>>,
    pub seeded: bool,
    pub rocket_errors: u32,
    pub chat_errors: u32,
}

impl NotifierState {
    pub fn is_exhausted(&self) -> bool {
        self.rocket_errors >= MAX_ERRORS || self.chat_errors >= MAX_ERRORS
    }
}

/// Builds one notification per subscriber.
///
/// A subscriber gets the texts of all its mention configurations that match one of the `mentioned` users,
/// one per line; when none match it gets the default text.
pub fn build_notifications(subscribers: &[Subscriber], mentioned: &BTreeSet<String>) -> Vec<Notification> {
    subscribers
        .iter()
        .map(|subscriber| {
            let texts: Vec<&str> = subscriber
                .mentions
                .iter()
                .filter(|m| mentioned.iter().any(|user| user.eq_ignore_ascii_case(&m.mentioned_username)))
                .map(|m| m.notification_text.as_str())
                .collect();

            let text = if texts.is_empty() { replies::DEFAULT_NOTIFICATION.to_string() } else { texts.join("\n") };

            Notification { chat_id: subscriber.chat_id, text }
        })
        .collect()
}

// Structs.

/// The Rocket.Chat polling loop.
#[derive(Clone)]
pub struct Notifier {
    rocket: RocketChatClient,
    chat: ChatClient,
    subscriptions: SubscriptionService,
    interval: Duration,
    message_count: u32,
}

impl Notifier {
    pub fn new(rocket: RocketChatClient, chat: ChatClient, subscriptions: SubscriptionService, interval: Duration, message_count: u32) -> Self {
        Self {
            rocket,
            chat,
            subscriptions,
            interval,
            message_count,
        }
    }

    /// Authenticates and polls until too many consecutive errors occur.
    #[instrument(skip_all)]
    pub async fn run(&self) -> Void {
        self.rocket.authenticate().await?;

        info!("Checking new Rocket.Chat messages every {} seconds.", self.interval.as_secs());

        let mut state = NotifierState::default();
        self.check(&mut state).await?;

        loop {
            if state.is_exhausted() {
                error!("Maximum number of errors reached, notifications stopped.");
                return Err(anyhow::anyhow!("The notifier stopped after {} consecutive errors.", MAX_ERRORS));
            }

            tokio::time::sleep(self.interval).await;

            self.check(&mut state).await?;
        }
    }

    /// One polling step.
    ///
    /// The first successful read only records the newest timestamp; later reads notify about anything newer.
    pub async fn check(&self, state: &mut NotifierState) -> Void {
        let messages = self.recent_messages(state).await;
        let Some(newest) = messages.first() else {
            return Ok(());
        };

        if !state.seeded {
            state.seeded = true;
            state.last_seen = Some(newest.timestamp);
            return Ok(());
        }

        let fresh: Vec<&RocketMessage> = messages.iter().take_while(|m| state.last_seen.is_none_or(|seen| m.timestamp > seen)).collect();
        if fresh.is_empty() {
            return Ok(());
        }

        info!("{} new Rocket.Chat message(s) received.", fresh.len());

        let subscribers = match self.subscriptions.get_subscribers().await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                // Retried on the next check since `last_seen` has not moved.
                warn!("Failed to load subscribers: {}", e);
                return Ok(());
            }
        };

        state.last_seen = Some(newest.timestamp);

        let mentioned: BTreeSet<String> = fresh.iter().flat_map(|m| m.mentions.iter().cloned()).collect();

        let sends = build_notifications(&subscribers, &mentioned).into_iter().map(|notification| async move {
            let result = self.chat.send_message(notification.chat_id, &notification.text, None).await;
            (notification, result)
        });

        for (notification, result) in futures::future::join_all(sends).await {
            match result {
                Ok(_) => state.chat_errors = 0,
                Err(e) => {
                    state.chat_errors += 1;
                    error!("Failed to notify chat `{}` ({}/{}): {}", notification.chat_id, state.chat_errors, MAX_ERRORS, e);
                }
            }
        }

        Ok(())
    }

    async fn recent_messages(&self, state: &mut NotifierState) -> Vec<RocketMessage> {
        match self.rocket.get_recent_messages(self.message_count).await {
            Ok(messages) => {
                state.rocket_errors = 0;
                messages
            }
            Err(e) => {
                state.rocket_errors += 1;
                error!("Failed to read Rocket.Chat messages ({}/{}): {}", state.rocket_errors, MAX_ERRORS, e);
                Vec::new()
            }
        }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::db::MentionConfiguration;

    #[test]
    fn test_notifications_use_mention_text() {
        let plain = Subscriber::new(1);
        let custom = Subscriber {
            chat_id: 2,
            mentions: vec![MentionConfiguration { mentioned_username: "Alice".into(), notification_text: "Alice was mentioned".into() }],
        };

        let mentioned = BTreeSet::from(["alice".to_string()]);
        let notifications = build_notifications(&[plain.clone(), custom.clone()], &mentioned);

        assert_eq!(
            notifications,
            vec![
                Notification { chat_id: 1, text: replies::DEFAULT_NOTIFICATION.into() },
                Notification { chat_id: 2, text: "Alice was mentioned".into() },
            ]
        );

        let notifications = build_notifications(&[custom.clone()], &BTreeSet::new());
        assert_eq!(notifications[0].text, replies::DEFAULT_NOTIFICATION);
    }

    #[test]
    fn test_notifications_join_every_matching_mention() {
        let subscriber = Subscriber {
            chat_id: 3,
            mentions: vec![
                MentionConfiguration { mentioned_username: "alice".into(), notification_text: "Alice was mentioned".into() },
                MentionConfiguration { mentioned_username: "bob".into(), notification_text: "Bob was mentioned".into() },
                MentionConfiguration { mentioned_username: "carol".into(), notification_text: "Carol was mentioned".into() },
            ],
        };

        let mentioned = BTreeSet::from(["alice".to_string(), "bob".to_string()]);
        let notifications = build_notifications(&[subscriber], &mentioned);

        assert_eq!(notifications[0].text, "Alice was mentioned\nBob was mentioned");
    }

    #[test]
    fn test_state_exhaustion() {
        let mut state = NotifierState::default();
        assert!(!state.is_exhausted());

        state.chat_errors = MAX_ERRORS;
        assert!(state.is_exhausted());
    }
}
