//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};

use super::types::Res;

/// Default database endpoint (an in-memory SurrealDB instance).
fn default_db_endpoint() -> String {
    "mem://".to_string()
}

/// Default database namespace.
fn default_db_namespace() -> String {
    "rocket_notify".to_string()
}

/// Default database name.
fn default_db_database() -> String {
    "bot".to_string()
}

/// Default number of Rocket.Chat messages requested per check.
fn default_rocket_chat_message_count() -> u32 {
    10
}

/// Default interval between Rocket.Chat checks.
fn default_message_check_interval() -> Duration {
    Duration::from_secs(6)
}

/// Default lifetime of an unanswered conversation.
fn default_conversation_ttl() -> Duration {
    Duration::from_secs(600)
}

/// Configuration for the rocket-notify-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Telegram bot token (`TELEGRAM_BOT_TOKEN`).
    pub telegram_bot_token: String,
    /// Telegram bot handle, with or without the leading `@` (`TELEGRAM_BOT_NAME`).
    /// Required for the bot to accept commands in group chats.
    #[serde(default)]
    pub telegram_bot_name: Option<String>,
    /// Secret key that chats must provide to subscribe (`SUBSCRIPTION_SECRET`).
    #[serde(default)]
    pub subscription_secret: Option<String>,
    /// Database endpoint URL, e.g. `mem://` or `ws://localhost:8000` (`DB_ENDPOINT`).
    #[serde(default = "default_db_endpoint")]
    pub db_endpoint: String,
    /// Database username (`DB_USERNAME`).
    #[serde(default)]
    pub db_username: Option<String>,
    /// Database password (`DB_PASSWORD`).
    #[serde(default)]
    pub db_password: Option<String>,
    /// Database namespace (`DB_NAMESPACE`).
    #[serde(default = "default_db_namespace")]
    pub db_namespace: String,
    /// Database name (`DB_DATABASE`).
    #[serde(default = "default_db_database")]
    pub db_database: String,
    /// Rocket.Chat server URL; the notifier only runs when this is set (`ROCKET_CHAT_SERVER`).
    #[serde(default)]
    pub rocket_chat_server: Option<String>,
    /// Rocket.Chat username (`ROCKET_CHAT_USER_NAME`).
    #[serde(default)]
    pub rocket_chat_user_name: Option<String>,
    /// Rocket.Chat password (`ROCKET_CHAT_PASSWORD`).
    #[serde(default)]
    pub rocket_chat_password: Option<String>,
    /// Rocket.Chat personal auth token (`ROCKET_CHAT_AUTH_TOKEN`).
    #[serde(default)]
    pub rocket_chat_auth_token: Option<String>,
    /// Rocket.Chat private group to watch (`ROCKET_CHAT_GROUP_NAME`).
    #[serde(default)]
    pub rocket_chat_group_name: Option<String>,
    /// Number of recent messages requested per check (`ROCKET_CHAT_MESSAGE_COUNT`).
    #[serde(default = "default_rocket_chat_message_count")]
    pub rocket_chat_message_count: u32,
    /// Seconds between Rocket.Chat checks (`MESSAGE_CHECK_INTERVAL`).
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_message_check_interval")]
    pub message_check_interval: Duration,
    /// Seconds an unanswered conversation is kept before it is dropped (`CONVERSATION_TTL`).
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_conversation_ttl")]
    pub conversation_ttl: Duration,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            telegram_bot_token: String::new(),
            telegram_bot_name: None,
            subscription_secret: None,
            db_endpoint: default_db_endpoint(),
            db_username: None,
            db_password: None,
            db_namespace: default_db_namespace(),
            db_database: default_db_database(),
            rocket_chat_server: None,
            rocket_chat_user_name: None,
            rocket_chat_password: None,
            rocket_chat_auth_token: None,
            rocket_chat_group_name: None,
            rocket_chat_message_count: default_rocket_chat_message_count(),
            message_check_interval: default_message_check_interval(),
            conversation_ttl: default_conversation_ttl(),
        }
    }
}

impl ConfigInner {
    /// The bot handle with a leading `@`, or `None` when not configured.
    pub fn bot_name(&self) -> Option<String> {
        let name = self.telegram_bot_name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;

        if name.starts_with('@') { Some(name.to_string()) } else { Some(format!("@{name}")) }
    }

    /// The configured subscription secret, if it is not blank.
    pub fn subscription_secret(&self) -> Option<String> {
        self.subscription_secret.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
    }

    /// The Rocket.Chat server URL without a trailing slash.
    pub fn rocket_chat_server(&self) -> Option<String> {
        self.rocket_chat_server.as_deref().map(|s| s.trim().trim_end_matches('/')).filter(|s| !s.is_empty()).map(str::to_string)
    }

    /// The Rocket.Chat group name, lowercased.
    pub fn rocket_chat_group_name(&self) -> Option<String> {
        self.rocket_chat_group_name.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase)
    }

    /// Checks the values that cannot be expressed through the types alone.
    pub fn validate(&self) -> Res<()> {
        if self.telegram_bot_token.trim().is_empty() {
            return Err(anyhow::anyhow!("Telegram bot token must be provided."));
        }

        if self.rocket_chat_message_count < 1 || self.rocket_chat_message_count > 100 {
            return Err(anyhow::anyhow!("Rocket.Chat message count must be between 1 and 100."));
        }

        if self.message_check_interval < Duration::from_secs(1) {
            return Err(anyhow::anyhow!("Message check interval must be at least one second."));
        }

        if self.conversation_ttl < Duration::from_secs(1) {
            return Err(anyhow::anyhow!("Conversation TTL must be at least one second."));
        }

        if self.rocket_chat_server().is_some() {
            if self.rocket_chat_group_name().is_none() {
                return Err(anyhow::anyhow!("Rocket.Chat group name must be provided when a server is configured."));
            }

            let has_token = self.rocket_chat_auth_token.as_deref().is_some_and(|t| !t.is_empty());
            let has_credentials = self.rocket_chat_user_name.as_deref().is_some_and(|u| !u.is_empty()) && self.rocket_chat_password.as_deref().is_some_and(|p| !p.is_empty());

            if !has_token && !has_credentials {
                return Err(anyhow::anyhow!("Either a Rocket.Chat auth token or both user name and password must be provided."));
            }
        }

        Ok(())
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("ROCKET_NOTIFY"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ConfigInner {
        ConfigInner {
            telegram_bot_token: "123:abc".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_bot_name_is_prefixed() {
        let mut inner = valid();
        inner.telegram_bot_name = Some("rocket_bot".into());
        assert_eq!(inner.bot_name().as_deref(), Some("@rocket_bot"));

        inner.telegram_bot_name = Some("@rocket_bot".into());
        assert_eq!(inner.bot_name().as_deref(), Some("@rocket_bot"));

        inner.telegram_bot_name = Some("  ".into());
        assert_eq!(inner.bot_name(), None);
    }

    #[test]
    fn test_blank_secret_means_no_secret() {
        let mut inner = valid();
        inner.subscription_secret = Some("   ".into());

        assert_eq!(inner.subscription_secret(), None);
    }

    #[test]
    fn test_rocket_chat_settings_are_normalized() {
        let mut inner = valid();
        inner.rocket_chat_server = Some("https://chat.example.com/".into());
        inner.rocket_chat_group_name = Some("Support".into());

        assert_eq!(inner.rocket_chat_server().as_deref(), Some("https://chat.example.com"));
        assert_eq!(inner.rocket_chat_group_name().as_deref(), Some("support"));
    }

    #[test]
    fn test_validate_requires_token() {
        let inner = ConfigInner::default();
        assert!(inner.validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rocket_chat_credentials() {
        let mut inner = valid();
        inner.rocket_chat_server = Some("https://chat.example.com".into());
        inner.rocket_chat_group_name = Some("support".into());
        assert!(inner.validate().is_err());

        inner.rocket_chat_auth_token = Some("token".into());
        assert!(inner.validate().is_ok());

        inner.rocket_chat_auth_token = None;
        inner.rocket_chat_user_name = Some("user".into());
        inner.rocket_chat_password = Some("pass".into());
        assert!(inner.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_conversation_ttl() {
        let mut inner = valid();
        inner.conversation_ttl = Duration::ZERO;
        assert!(inner.validate().is_err());

        inner.conversation_ttl = Duration::from_secs(1);
        assert!(inner.validate().is_ok());
    }

    #[test]
    fn test_validate_message_count_bounds() {
        let mut inner = valid();
        inner.rocket_chat_message_count = 0;
        assert!(inner.validate().is_err());

        inner.rocket_chat_message_count = 101;
        assert!(inner.validate().is_err());
    }
}
