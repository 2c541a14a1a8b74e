//! Rocket.Chat REST API implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use crate::base::{
    config::Config,
    types::{Res, Void},
};

use super::{GenericRocketChatClient, RocketChatClient, RocketMessage};

const LOGIN_API_URL: &str = "/api/v1/login";
const GROUP_MESSAGES_API_URL: &str = "/api/v1/groups.messages";

// Extra methods on `RocketChatClient` applied by the REST implementation.

impl RocketChatClient {
    /// Creates a REST Rocket.Chat client, or `None` when no server is configured.
    pub fn rest(config: &Config) -> Res<Option<Self>> {
        let Some(server) = config.rocket_chat_server() else {
            return Ok(None);
        };

        let group_name = config.rocket_chat_group_name().ok_or_else(|| anyhow::anyhow!("Rocket.Chat group chat name cannot be empty."))?;

        let client = RestRocketChatClient {
            http: reqwest::Client::new(),
            server,
            group_name,
            user_name: config.rocket_chat_user_name.clone().unwrap_or_default(),
            password: config.rocket_chat_password.clone().unwrap_or_default(),
            auth_token: config.rocket_chat_auth_token.clone().unwrap_or_default(),
            auth: Arc::new(RwLock::new(None)),
        };

        Ok(Some(Self::new(Arc::new(client))))
    }
}

// DTOs.

#[derive(Debug, Serialize)]
struct LoginRequestDto<'a> {
    user: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct ResumeRequestDto<'a> {
    resume: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResultDto {
    data: UserDataDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDataDto {
    user_id: String,
    auth_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorDto {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesDto {
    #[serde(default)]
    messages: Vec<MessageDto>,
}

#[derive(Debug, Deserialize)]
struct MessageDto {
    #[serde(rename = "_id")]
    id: String,
    ts: DateTime<Utc>,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    mentions: Vec<MentionDto>,
}

#[derive(Debug, Deserialize)]
struct MentionDto {
    #[serde(default)]
    username: Option<String>,
}

impl From<MessageDto> for RocketMessage {
    fn from(dto: MessageDto) -> Self {
        Self {
            id: dto.id,
            timestamp: dto.ts,
            text: dto.msg,
            mentions: dto.mentions.into_iter().filter_map(|m| m.username).collect(),
        }
    }
}

// Client.

/// Credentials obtained from a successful login.
#[derive(Debug, Clone)]
struct AuthData {
    user_id: String,
    auth_token: String,
}

/// REST Rocket.Chat client.
#[derive(Clone)]
struct RestRocketChatClient {
    http: reqwest::Client,
    server: String,
    group_name: String,
    user_name: String,
    password: String,
    auth_token: String,
    auth: Arc<RwLock<Option<AuthData>>>,
}

impl RestRocketChatClient {
    /// Posts a login payload; returns the credentials on success.
    async fn login<T: Serialize>(&self, payload: &T) -> Res<AuthData> {
        let response = self.http.post(format!("{}{}", self.server, LOGIN_API_URL)).json(payload).send().await?;
        let result: LoginResultDto = read_response(response).await?;

        Ok(AuthData {
            user_id: result.data.user_id,
            auth_token: result.data.auth_token,
        })
    }

    async fn authenticate_by_auth_token(&self) -> Option<AuthData> {
        if self.auth_token.is_empty() {
            return None;
        }

        info!("Rocket.Chat auth token resume in progress ...");

        match self.login(&ResumeRequestDto { resume: &self.auth_token }).await {
            Ok(auth) => {
                info!("Rocket.Chat auth token has been resumed successfully.");
                Some(auth)
            }
            Err(e) => {
                warn!("Rocket.Chat auth token resume has failed: {}", e);
                None
            }
        }
    }

    async fn authenticate_by_credentials(&self) -> Option<AuthData> {
        if self.user_name.is_empty() || self.password.is_empty() {
            return None;
        }

        info!("Rocket.Chat authentication with username and password in progress ...");

        match self.login(&LoginRequestDto { user: &self.user_name, password: &self.password }).await {
            Ok(auth) => {
                info!("Rocket.Chat client has been authenticated successfully.");
                Some(auth)
            }
            Err(e) => {
                error!("Rocket.Chat login has failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl GenericRocketChatClient for RestRocketChatClient {
    #[instrument(skip(self))]
    async fn authenticate(&self) -> Void {
        if self.auth.read().await.is_some() {
            return Err(anyhow::anyhow!("The Rocket.Chat client is already authenticated."));
        }

        let auth = match self.authenticate_by_auth_token().await {
            Some(auth) => Some(auth),
            None => self.authenticate_by_credentials().await,
        };

        let Some(auth) = auth else {
            return Err(anyhow::anyhow!("Failed to authenticate to Rocket.Chat."));
        };

        *self.auth.write().await = Some(auth);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_recent_messages(&self, count: u32) -> Res<Vec<RocketMessage>> {
        let auth = self.auth.read().await.clone().ok_or_else(|| anyhow::anyhow!("The Rocket.Chat client is not authenticated."))?;

        let count = count.to_string();

        let response = self
            .http
            .get(format!("{}{}", self.server, GROUP_MESSAGES_API_URL))
            .query(&[("roomName", self.group_name.as_str()), ("count", count.as_str())])
            .header("X-Auth-Token", &auth.auth_token)
            .header("X-User-Id", &auth.user_id)
            .send()
            .await?;

        let messages: MessagesDto = read_response(response).await?;

        Ok(messages.messages.into_iter().map(RocketMessage::from).collect())
    }
}

/// Deserializes a successful response, or turns the server's error payload into an error.
async fn read_response<T: DeserializeOwned>(response: Response) -> Res<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(api_error(status, &body));
    }

    Ok(serde_json::from_str(&body)?)
}

fn api_error(status: StatusCode, body: &str) -> anyhow::Error {
    let detail = serde_json::from_str::<ErrorDto>(body).ok().and_then(|e| e.error.or(e.message)).unwrap_or_else(|| body.to_string());

    anyhow::anyhow!("Rocket.Chat API error ({}): {}", status, detail)
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_payload_is_mapped() {
        let body = r#"{
            "messages": [
                { "_id": "b", "ts": "2024-05-01T10:00:05.000Z", "msg": "ping @alice", "mentions": [{ "_id": "u1", "username": "alice" }] },
                { "_id": "a", "ts": "2024-05-01T10:00:00.000Z", "msg": "hello" }
            ],
            "count": 2,
            "total": 40,
            "success": true
        }"#;

        let dto: MessagesDto = serde_json::from_str(body).unwrap();
        let messages: Vec<RocketMessage> = dto.messages.into_iter().map(RocketMessage::from).collect();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "b");
        assert_eq!(messages[0].mentions, vec!["alice".to_string()]);
        assert!(messages[0].timestamp > messages[1].timestamp);
        assert!(messages[1].mentions.is_empty());
    }

    #[test]
    fn test_api_error_uses_error_field() {
        let err = api_error(StatusCode::UNAUTHORIZED, r#"{ "status": "error", "error": "You must be logged in to do this." }"#);

        assert!(err.to_string().contains("You must be logged in to do this."));
    }

    #[test]
    fn test_api_error_falls_back_to_body() {
        let err = api_error(StatusCode::BAD_GATEWAY, "upstream down");

        assert!(err.to_string().contains("upstream down"));
    }
}
