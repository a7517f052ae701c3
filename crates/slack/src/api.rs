use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatApiError {
    #[error("slack web api transport failure: {0}")]
    Transport(String),
    #[error("slack web api rejected `{method}`: {code}")]
    Platform { method: String, code: String },
}

/// The two Web API calls a delivery needs: open the recipient's DM channel,
/// then post into it.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Open (or reuse) the private channel with `user_id`. `Ok(None)` means
    /// the platform accepted the call but reported no usable channel id.
    async fn open_dm(&self, user_id: &str) -> Result<Option<String>, ChatApiError>;

    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        blocks: Option<&[Value]>,
    ) -> Result<(), ChatApiError>;
}

/// Constructs one client per token. Injected into the pool so tests can
/// count constructions and substitute recording fakes.
pub trait ClientFactory: Send + Sync {
    fn build(&self, token: &str) -> Arc<dyn ChatApi>;
}

/// Real Web API client bound to a single bot token.
pub struct SlackWebApi {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl SlackWebApi {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self { http, base_url: base_url.trim_end_matches('/').to_owned(), token: token.into() }
    }

    async fn call<T>(&self, method: &str, body: Value) -> Result<T, ChatApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|error| ChatApiError::Transport(error.to_string()))?;

        response.json::<T>().await.map_err(|error| ChatApiError::Transport(error.to_string()))
    }
}

#[async_trait]
impl ChatApi for SlackWebApi {
    async fn open_dm(&self, user_id: &str) -> Result<Option<String>, ChatApiError> {
        let envelope: OpenConversationEnvelope =
            self.call("conversations.open", serde_json::json!({ "users": user_id })).await?;
        envelope.into_channel_id()
    }

    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        blocks: Option<&[Value]>,
    ) -> Result<(), ChatApiError> {
        let mut body = serde_json::json!({ "channel": channel_id, "text": text });
        if let Some(blocks) = blocks {
            body["blocks"] = Value::Array(blocks.to_vec());
        }

        let envelope: ApiEnvelope = self.call("chat.postMessage", body).await?;
        envelope.into_result("chat.postMessage")
    }
}

/// Builds [`SlackWebApi`] clients that share one HTTP connection pool.
pub struct WebApiFactory {
    http: reqwest::Client,
    base_url: String,
}

impl WebApiFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }
}

impl ClientFactory for WebApiFactory {
    fn build(&self, token: &str) -> Arc<dyn ChatApi> {
        Arc::new(SlackWebApi::new(self.http.clone(), self.base_url.clone(), token))
    }
}

/// Minimal `ok`/`error` envelope every Web API response carries.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl ApiEnvelope {
    fn into_result(self, method: &str) -> Result<(), ChatApiError> {
        if self.ok {
            Ok(())
        } else {
            Err(ChatApiError::Platform {
                method: method.to_owned(),
                code: self.error.unwrap_or_else(|| "unknown_error".to_owned()),
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenConversationEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<ConversationChannel>,
}

#[derive(Debug, Deserialize)]
struct ConversationChannel {
    #[serde(default)]
    id: Option<String>,
}

impl OpenConversationEnvelope {
    fn into_channel_id(self) -> Result<Option<String>, ChatApiError> {
        if !self.ok {
            return Err(ChatApiError::Platform {
                method: "conversations.open".to_owned(),
                code: self.error.unwrap_or_else(|| "unknown_error".to_owned()),
            });
        }
        Ok(self.channel.and_then(|channel| channel.id))
    }
}
