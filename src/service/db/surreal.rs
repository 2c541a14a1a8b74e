//! SurrealDB implementation of the subscriber store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::{
    Surreal,
    engine::any::{self, Any},
    opt::auth::Root,
};
use tracing::{info, instrument};

use crate::base::{config::Config, error::SubscriptionError, types::{ChatId, Res}};

use super::{DbClient, GenericDbClient, MentionConfiguration, SubRes, Subscriber};

const SUBSCRIBER_TABLE: &str = "subscriber";

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Creates a SurrealDB client from the configuration.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let client = SurrealDbClient::new(config).await?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Creates a SurrealDB client backed by a fresh in-memory instance.
    pub async fn surreal_memory() -> Res<Self> {
        let client = SurrealDbClient::connect("mem://", None, "rocket_notify", "bot").await?;
        Ok(Self::new(Arc::new(client)))
    }
}

// Records.

/// A subscriber row in the database; the record id is the chat id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SubscriberRecord {
    chat_id: ChatId,
    #[serde(default)]
    mentions: Vec<MentionConfiguration>,
    created_at: DateTime<Utc>,
}

impl From<SubscriberRecord> for Subscriber {
    fn from(record: SubscriberRecord) -> Self {
        Self {
            chat_id: record.chat_id,
            mentions: record.mentions,
        }
    }
}

// Client.

/// SurrealDB subscriber store.
#[derive(Clone)]
pub struct SurrealDbClient {
    db: Surreal<Any>,
}

impl SurrealDbClient {
    /// Connects using the configured endpoint and credentials.
    #[instrument(skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        let credentials = match (&config.db_username, &config.db_password) {
            (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
            _ => None,
        };

        Self::connect(&config.db_endpoint, credentials, &config.db_namespace, &config.db_database).await
    }

    async fn connect(endpoint: &str, credentials: Option<(&str, &str)>, namespace: &str, database: &str) -> Res<Self> {
        let db = any::connect(endpoint).await?;

        if let Some((username, password)) = credentials {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns(namespace).use_db(database).await?;

        // Define schemas.

        db.query("DEFINE TABLE IF NOT EXISTS subscriber SCHEMALESS").await?.check()?;

        info!("Database initialized successfully ({}).", endpoint);

        Ok(Self { db })
    }
}

fn operation_error(e: surrealdb::Error) -> SubscriptionError {
    SubscriptionError::Operation(e.to_string())
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(skip(self))]
    async fn add_subscriber(&self, chat_id: ChatId) -> SubRes<()> {
        let existing: Option<SubscriberRecord> = self.db.select((SUBSCRIBER_TABLE, chat_id)).await.map_err(operation_error)?;

        if existing.is_some() {
            return Err(SubscriptionError::AlreadyExists(chat_id));
        }

        let record = SubscriberRecord {
            chat_id,
            mentions: Vec::new(),
            created_at: Utc::now(),
        };

        let created: Option<SubscriberRecord> = match self.db.create((SUBSCRIBER_TABLE, chat_id)).content(record).await {
            Ok(created) => created,
            Err(e) => {
                // A concurrent add for the same chat may have created the record in between.
                let existing: Option<SubscriberRecord> = self.db.select((SUBSCRIBER_TABLE, chat_id)).await.map_err(operation_error)?;

                return Err(if existing.is_some() { SubscriptionError::AlreadyExists(chat_id) } else { operation_error(e) });
            }
        };

        if created.is_none() {
            return Err(SubscriptionError::Operation(format!("Subscriber `{chat_id}` was not created.")));
        }

        info!("Subscriber `{}` added.", chat_id);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_subscriber(&self, chat_id: ChatId) -> SubRes<()> {
        let deleted: Option<SubscriberRecord> = self.db.delete((SUBSCRIBER_TABLE, chat_id)).await.map_err(operation_error)?;

        if deleted.is_none() {
            return Err(SubscriptionError::NotFound(chat_id));
        }

        info!("Subscriber `{}` removed.", chat_id);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_subscribers(&self) -> SubRes<Vec<Subscriber>> {
        let records: Vec<SubscriberRecord> = self.db.select(SUBSCRIBER_TABLE).await.map_err(operation_error)?;

        Ok(records.into_iter().map(Subscriber::from).collect())
    }
}

// Tests.
