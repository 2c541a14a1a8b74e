pub mod rest;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::base::types::{Res, Void};

// Types.

/// A message read from the watched Rocket.Chat group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RocketMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    /// Usernames mentioned in the message.
    pub mentions: Vec<String>,
}

// Traits.

/// Generic Rocket.Chat client trait that clients must implement.
///
/// The notifier only needs to authenticate once and then read the most recent messages of the watched group.
#[async_trait]
pub trait GenericRocketChatClient: Send + Sync + 'static {
    /// Authenticate against the server.
    async fn authenticate(&self) -> Void;

    /// Get up to `count` of the most recent messages in the watched group, newest first.
    async fn get_recent_messages(&self, count: u32) -> Res<Vec<RocketMessage>>;
}

// Structs.

/// Rocket.Chat client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct RocketChatClient {
    inner: Arc<dyn GenericRocketChatClient>,
}

impl Deref for RocketChatClient {
    type Target = dyn GenericRocketChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl RocketChatClient {
    pub fn new(inner: Arc<dyn GenericRocketChatClient>) -> Self {
        Self { inner }
    }
}
