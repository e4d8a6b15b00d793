use std::time::Duration;

use async_trait::async_trait;
use boxer_core::config::{AnthropicConfig, OllamaConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const SYSTEM_PROMPT: &str = "You are Boxer, the internal assistant for Box and Humanscape. \
Language policy: reply in Korean by default; if the user asks in English, reply in English. \
Tone policy: always use informal/casual tone; do not use Korean honorific endings such as 요/습니다. \
Answer policy: keep replies concise (normally 3-6 sentences) and start with the key point. \
Format policy: provide a one-line summary first, then details when useful. \
Do not add unnecessary apologies, meta commentary, or long preambles. \
If evidence is insufficient, explicitly say you do not know; do not guess. \
Do not assert uncertain facts (versions, specs, prices, policies). \
If a question is ambiguous, ask exactly one clarifying question. \
For list requests based on thread messages, return all items with original order and count, with no omissions. \
Prioritize Box/Humanscape context in your answers.";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ERROR_DETAIL_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} client setup failed: {message}")]
    Setup { provider: &'static str, message: String },
    #[error("{provider} API connection failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} API HTTP {status}: {detail}")]
    Api { provider: &'static str, status: u16, detail: String },
    #[error("{provider} API returned invalid JSON: {message}")]
    InvalidResponse { provider: &'static str, message: String },
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// An empty string means the model produced no usable text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

pub(crate) fn truncate_detail(body: &str) -> String {
    body.chars().take(ERROR_DETAIL_CHARS).collect()
}

fn http_client(provider: &'static str, timeout_secs: u64) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|error| LlmError::Setup { provider, message: error.to_string() })
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, LlmError> {
    let status = response.status();
    let body =
        response.text().await.map_err(|source| LlmError::Transport { provider, source })?;

    if !status.is_success() {
        let detail = truncate_detail(&body);
        warn!(event_name = "llm.api.error", provider, status = status.as_u16(), body = %detail, "LLM API error");
        return Err(LlmError::Api { provider, status: status.as_u16(), detail });
    }

    serde_json::from_str(&body)
        .map_err(|error| LlmError::InvalidResponse { provider, message: error.to_string() })
}

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub const PROVIDER: &'static str = "claude";

    pub fn new(config: &AnthropicConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or_else(|| LlmError::Setup {
            provider: Self::PROVIDER,
            message: "ANTHROPIC_API_KEY is not configured".to_string(),
        })?;

        Ok(Self {
            http: http_client(Self::PROVIDER, config.timeout_secs)?,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    fn answer(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<String>()
            .trim()
            .to_string()
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: [UserMessage { role: "user", content: prompt }],
        };

        debug!(event_name = "llm.request.sent", provider = Self::PROVIDER, model = %self.model, "sending request to Anthropic");

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|source| LlmError::Transport { provider: Self::PROVIDER, source })?;

        let parsed: MessagesResponse = read_json(Self::PROVIDER, response).await?;
        Ok(parsed.answer())
    }
}

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OllamaClient {
    pub const PROVIDER: &'static str = "ollama";

    pub fn new(config: &OllamaConfig) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client(Self::PROVIDER, config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<serde_json::Value>,
}

impl GenerateResponse {
    fn answer(&self) -> String {
        match &self.response {
            Some(serde_json::Value::String(text)) => text.trim().to_string(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string().trim().to_string(),
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = GenerateRequest {
            model: &self.model,
            system,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: self.temperature },
        };

        debug!(event_name = "llm.request.sent", provider = Self::PROVIDER, model = %self.model, "sending request to Ollama");

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|source| LlmError::Transport { provider: Self::PROVIDER, source })?;

        let parsed: GenerateResponse = read_json(Self::PROVIDER, response).await?;
        Ok(parsed.answer())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        truncate_detail, GenerateOptions, GenerateRequest, GenerateResponse, MessagesRequest,
        MessagesResponse, UserMessage, SYSTEM_PROMPT,
    };

    #[test]
    fn claude_answer_joins_only_text_blocks() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "  한 줄 요약."},
                {"type": "tool_use", "id": "t1", "name": "lookup", "input": {}},
                {"type": "text", "text": " 세부 내용  "}
            ]
        }))
        .expect("fixture should deserialize");

        assert_eq!(response.answer(), "한 줄 요약. 세부 내용");
    }

    #[test]
    fn claude_request_carries_system_and_single_user_turn() {
        let body = MessagesRequest {
            model: "claude-sonnet-4-6",
            max_tokens: 700,
            system: SYSTEM_PROMPT,
            messages: [UserMessage { role: "user", content: "안녕" }],
        };
        let value = serde_json::to_value(&body).expect("request should serialize");

        assert_eq!(value["max_tokens"], 700);
        assert_eq!(value["messages"], json!([{"role": "user", "content": "안녕"}]));
        assert!(value["system"].as_str().is_some_and(|text| text.starts_with("You are Boxer")));
    }

    #[test]
    fn ollama_request_disables_streaming() {
        let body = GenerateRequest {
            model: "qwen2.5:1.5b",
            system: "sys",
            prompt: "질문",
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };
        let value = serde_json::to_value(&body).expect("request should serialize");

        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["temperature"], 0.0);
        assert_eq!(value["prompt"], "질문");
    }

    #[test]
    fn ollama_missing_response_is_empty() {
        let response: GenerateResponse =
            serde_json::from_value(json!({"done": true})).expect("fixture should deserialize");
        assert_eq!(response.answer(), "");

        let response: GenerateResponse =
            serde_json::from_value(json!({"response": "  답변 \n"})).expect("fixture");
        assert_eq!(response.answer(), "답변");
    }

    #[test]
    fn error_detail_is_bounded_by_characters() {
        let body = "가".repeat(500);
        assert_eq!(truncate_detail(&body).chars().count(), 200);
    }
}
