use std::fmt;

use thiserror::Error;

/// External systems a mention can reach while producing its reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    Claude,
    Ollama,
    Database,
    AppUserApi,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Ollama => "ollama",
            Self::Database => "database",
            Self::AppUserApi => "app_user_api",
        }
    }

    /// Apology shown in the thread when a call to this service fails.
    pub fn user_apology(&self) -> &'static str {
        match self {
            Self::Claude => "AI 응답 중 오류가 발생했어. 잠시 후 다시 시도해줘",
            Self::Ollama => "Ollama 응답 중 오류가 발생했어. 서버 연결 상태를 확인해줘",
            Self::Database => "DB 조회 중 오류가 발생했어. 연결 정보와 네트워크 상태를 확인해줘",
            Self::AppUserApi => "바코드 조회 중 오류가 발생했어. 잠시 후 다시 시도해줘",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("validation failure: {0}")]
    Validation(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{service} integration failure: {message}")]
    Integration { service: Service, message: String },
}

impl ApplicationError {
    pub fn integration(service: Service, message: impl Into<String>) -> Self {
        Self::Integration { service, message: message.into() }
    }

    /// Text that is safe to show in a Slack thread.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(reason) => format!("DB 조회 요청 형식 오류: {reason}"),
            Self::Integration { service, .. } => service.user_apology().to_string(),
            Self::Unauthorized(message) => message.clone(),
        }
    }
}
