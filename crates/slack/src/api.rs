use std::time::Duration;

use async_trait::async_trait;
use boxer_core::domain::mention::Reply;
use boxer_core::domain::thread::{HistoryMessage, ThreadHistory, ThreadHistoryError};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const SLACK_API_BASE: &str = "https://slack.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("slack http client setup failed: {0}")]
    Setup(String),
    #[error("slack {method} request failed: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("slack {method} returned error: {error}")]
    Api { method: &'static str, error: String },
    #[error("slack {method} response is missing `{field}`")]
    MissingField { method: &'static str, field: &'static str },
}

/// Posts replies into Slack threads.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn post_reply(&self, reply: &Reply) -> Result<(), SlackApiError>;
}

/// Thin Slack Web API client authenticated with the bot token.
pub struct SlackApiClient {
    http: reqwest::Client,
    bot_token: SecretString,
    base_url: String,
}

impl SlackApiClient {
    pub fn new(bot_token: SecretString) -> Result<Self, SlackApiError> {
        Self::with_base_url(bot_token, SLACK_API_BASE)
    }

    pub fn with_base_url(
        bot_token: SecretString,
        base_url: impl Into<String>,
    ) -> Result<Self, SlackApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| SlackApiError::Setup(error.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, bot_token, base_url })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// Socket Mode WebSocket URL, requested with the app-level token.
    pub async fn apps_connections_open(
        &self,
        app_token: &SecretString,
    ) -> Result<String, SlackApiError> {
        const METHOD: &str = "apps.connections.open";

        let response: ConnectionsOpenResponse = self
            .http
            .post(self.url(METHOD))
            .bearer_auth(app_token.expose_secret())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await
            .map_err(|source| SlackApiError::Transport { method: METHOD, source })?
            .json()
            .await
            .map_err(|source| SlackApiError::Transport { method: METHOD, source })?;

        check_ok(METHOD, response.ok, response.error)?;
        response.url.ok_or(SlackApiError::MissingField { method: METHOD, field: "url" })
    }

    /// Returns the `ts` of the posted message.
    pub async fn chat_post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, SlackApiError> {
        const METHOD: &str = "chat.postMessage";

        let body = PostMessageRequest { channel, text, thread_ts };
        let response: PostMessageResponse = self
            .http
            .post(self.url(METHOD))
            .bearer_auth(self.bot_token.expose_secret())
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&body)
            .send()
            .await
            .map_err(|source| SlackApiError::Transport { method: METHOD, source })?
            .json()
            .await
            .map_err(|source| SlackApiError::Transport { method: METHOD, source })?;

        check_ok(METHOD, response.ok, response.error)?;
        response.ts.ok_or(SlackApiError::MissingField { method: METHOD, field: "ts" })
    }

    pub async fn conversations_replies(
        &self,
        channel: &str,
        ts: &str,
        limit: u32,
    ) -> Result<Vec<HistoryMessage>, SlackApiError> {
        const METHOD: &str = "conversations.replies";

        let limit = limit.to_string();
        let response: RepliesResponse = self
            .http
            .get(self.url(METHOD))
            .bearer_auth(self.bot_token.expose_secret())
            .query(&[("channel", channel), ("ts", ts), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|source| SlackApiError::Transport { method: METHOD, source })?
            .json()
            .await
            .map_err(|source| SlackApiError::Transport { method: METHOD, source })?;

        check_ok(METHOD, response.ok, response.error)?;
        Ok(response
            .messages
            .into_iter()
            .map(|message| HistoryMessage {
                ts: message.ts,
                user: message.user,
                bot_id: message.bot_id,
                text: message.text,
            })
            .collect())
    }
}

fn check_ok(method: &'static str, ok: bool, error: Option<String>) -> Result<(), SlackApiError> {
    if ok {
        return Ok(());
    }
    Err(SlackApiError::Api { method, error: error.unwrap_or_else(|| "unknown".to_owned()) })
}

#[async_trait]
impl MessageSender for SlackApiClient {
    async fn post_reply(&self, reply: &Reply) -> Result<(), SlackApiError> {
        let ts = self.chat_post_message(&reply.channel_id, &reply.text, Some(&reply.thread_ts)).await?;
        debug!(
            event_name = "egress.slack.reply_posted",
            channel_id = %reply.channel_id,
            thread_ts = %reply.thread_ts,
            ts = %ts,
            "posted thread reply"
        );
        Ok(())
    }
}

#[async_trait]
impl ThreadHistory for SlackApiClient {
    async fn replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        limit: u32,
    ) -> Result<Vec<HistoryMessage>, ThreadHistoryError> {
        self.conversations_replies(channel_id, thread_ts, limit)
            .await
            .map_err(|error| ThreadHistoryError(error.to_string()))
    }
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Deserialize)]
struct ConnectionsOpenResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct RepliesResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Vec<RepliesMessage>,
}

#[derive(Deserialize)]
struct RepliesMessage {
    #[serde(default)]
    ts: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    text: String,
}
