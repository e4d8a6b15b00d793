use serde::{Deserialize, Serialize};

/// An inbound event that names the bot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMention {
    pub raw_text: String,
    pub author_id: Option<String>,
    pub channel_id: String,
    pub current_ts: String,
    /// The event's `thread_ts` when present, else its own `ts`.
    pub thread_ts: String,
}

impl InboundMention {
    pub fn new(
        raw_text: impl Into<String>,
        author_id: Option<String>,
        channel_id: impl Into<String>,
        current_ts: impl Into<String>,
        thread_ts: Option<String>,
    ) -> Self {
        let current_ts = current_ts.into();
        let thread_ts = thread_ts.filter(|ts| !ts.is_empty()).unwrap_or_else(|| current_ts.clone());
        Self {
            raw_text: raw_text.into(),
            author_id: author_id.filter(|id| !id.is_empty()),
            channel_id: channel_id.into(),
            current_ts,
            thread_ts,
        }
    }

    pub fn author(&self) -> Option<&str> {
        self.author_id.as_deref()
    }

    pub fn reply(&self, text: impl Into<String>) -> Reply {
        Reply {
            channel_id: self.channel_id.clone(),
            thread_ts: self.thread_ts.clone(),
            text: text.into(),
        }
    }
}

/// Text posted back into the thread a mention came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub channel_id: String,
    pub thread_ts: String,
    pub text: String,
}
