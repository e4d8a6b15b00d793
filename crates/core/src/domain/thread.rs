use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One message of a conversation thread as reported by the chat platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub ts: String,
    pub user: Option<String>,
    pub bot_id: Option<String>,
    pub text: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("thread history unavailable: {0}")]
pub struct ThreadHistoryError(pub String);

#[async_trait]
pub trait ThreadHistory: Send + Sync {
    /// Oldest first, at most `limit` messages.
    async fn replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        limit: u32,
    ) -> Result<Vec<HistoryMessage>, ThreadHistoryError>;
}

#[derive(Default)]
pub struct NoopThreadHistory;

#[async_trait]
impl ThreadHistory for NoopThreadHistory {
    async fn replies(
        &self,
        _channel_id: &str,
        _thread_ts: &str,
        _limit: u32,
    ) -> Result<Vec<HistoryMessage>, ThreadHistoryError> {
        Ok(Vec::new())
    }
}
