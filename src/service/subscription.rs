//! Subscription rules on top of the subscriber store.

use tracing::{instrument, warn};

use crate::base::{error::SubscriptionError, types::ChatId};

use super::db::{DbClient, SubRes, Subscriber};

/// Subscription service.
///
/// Owns the secret-key policy; the store only knows about chat ids. Trivially cloneable.
#[derive(Clone)]
pub struct SubscriptionService {
    db: DbClient,
    secret: Option<String>,
}

impl SubscriptionService {
    pub fn new(db: DbClient, secret: Option<String>) -> Self {
        let secret = secret.filter(|s| !s.trim().is_empty());
        Self { db, secret }
    }

    /// Whether chats must provide a key to subscribe.
    pub fn is_secret_key_required(&self) -> bool {
        self.secret.is_some()
    }

    /// Adds a chat to the subscribers, validating `key` when a secret is configured.
    #[instrument(skip(self, key))]
    pub async fn add_subscriber(&self, chat_id: ChatId, key: &str) -> SubRes<()> {
        if let Some(secret) = &self.secret
            && key.trim() != secret.trim()
        {
            warn!("Chat `{}` provided an invalid subscription key.", chat_id);
            return Err(SubscriptionError::NotAllowed);
        }

        self.db.add_subscriber(chat_id).await
    }

    /// Removes a chat from the subscribers.
    pub async fn remove_subscriber(&self, chat_id: ChatId) -> SubRes<()> {
        self.db.remove_subscriber(chat_id).await
    }

    /// Lists all subscribers.
    pub async fn get_subscribers(&self) -> SubRes<Vec<Subscriber>> {
        self.db.get_subscribers().await
    }
}

// Tests.
