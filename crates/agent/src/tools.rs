use std::time::Duration;

use async_trait::async_trait;
use boxer_core::config::AppUserApiConfig;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::llm::truncate_detail;

const USER_FIELDS: [&str; 3] = ["userPhoneNumber", "userSeq", "userRealName"];
const BABY_FIELDS: [&str; 5] = ["babySeq", "twinKey", "twinFlag", "birthDate", "babyNickname"];

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("APP_USER_API_URL is empty")]
    NotConfigured,
    #[error("app-user API URL is invalid: {0}")]
    InvalidUrl(String),
    #[error("app-user API client setup failed: {0}")]
    Setup(String),
    #[error("app-user API connection failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("app-user API HTTP {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("app-user API returned invalid JSON: {0}")]
    InvalidResponse(String),
}

/// Source of app users registered under a barcode.
#[async_trait]
pub trait AppUserDirectory: Send + Sync {
    /// Raw user records; empty when nobody is registered under the barcode.
    async fn find_by_barcode(&self, barcode: &str) -> Result<Vec<Value>, LookupError>;
}

pub struct HttpAppUserDirectory {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAppUserDirectory {
    pub fn new(config: &AppUserApiConfig) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| LookupError::Setup(error.to_string()))?;
        Ok(Self { http, base_url: config.url.trim().to_string() })
    }

    /// Appends `barcode` with `?` or `&` depending on the configured URL.
    pub fn endpoint(&self, barcode: &str) -> Result<Url, LookupError> {
        if self.base_url.is_empty() {
            return Err(LookupError::NotConfigured);
        }
        let mut url =
            Url::parse(&self.base_url).map_err(|error| LookupError::InvalidUrl(error.to_string()))?;
        url.query_pairs_mut().append_pair("barcode", barcode);
        Ok(url)
    }
}

#[async_trait]
impl AppUserDirectory for HttpAppUserDirectory {
    async fn find_by_barcode(&self, barcode: &str) -> Result<Vec<Value>, LookupError> {
        let endpoint = self.endpoint(barcode)?;
        debug!(event_name = "lookup.app_user.request_sent", host = endpoint.host_str().unwrap_or_default(), "querying app-user API");

        let response = self.http.get(endpoint).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = truncate_detail(&body);
            warn!(event_name = "lookup.app_user.api_error", status = status.as_u16(), body = %detail, "app-user API error");
            return Err(LookupError::Api { status: status.as_u16(), detail });
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|error| LookupError::InvalidResponse(error.to_string()))?;

        Ok(match payload.get("data") {
            Some(Value::Array(users)) => users.clone(),
            _ => Vec::new(),
        })
    }
}

pub fn format_lookup_report(barcode: &str, users: &[Value]) -> String {
    if users.is_empty() {
        return format!("바코드 {barcode}로 조회된 유저가 없어");
    }

    let mut lines = vec![
        format!("*바코드 조회 결과* :barcode: `{barcode}`"),
        format!("• 조회 건수: *{}건*", users.len()),
    ];

    for (user_index, user) in users.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("*user {}*", user_index + 1));
        for field in USER_FIELDS {
            lines.push(format!("• `{field}`: `{}`", display_value(user.get(field))));
        }

        let babies = match user.get("babies") {
            Some(Value::Array(babies)) if !babies.is_empty() => babies,
            _ => {
                lines.push("• `babies`: `[]`".to_string());
                continue;
            }
        };

        for (baby_index, baby) in babies.iter().enumerate() {
            lines.push(format!("• `babies[{baby_index}]`"));
            for field in BABY_FIELDS {
                lines.push(format!("  - `{field}`: `{}`", display_value(baby.get(field))));
            }
        }
    }

    lines.join("\n")
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                "null".to_string()
            } else {
                trimmed.to_string()
            }
        }
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(other) => other.to_string(),
    }
}
