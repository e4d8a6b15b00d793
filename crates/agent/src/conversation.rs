use std::sync::Arc;

use boxer_core::config::ThreadContextConfig;
use boxer_core::domain::thread::{HistoryMessage, ThreadHistory};
use tracing::error;

pub const MAX_FETCH_LIMIT: u32 = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextLimits {
    pub fetch_limit: u32,
    pub max_messages: usize,
    pub max_chars: usize,
}

impl From<&ThreadContextConfig> for ContextLimits {
    fn from(config: &ThreadContextConfig) -> Self {
        Self {
            fetch_limit: config.fetch_limit,
            max_messages: config.max_messages,
            max_chars: config.max_chars,
        }
    }
}

/// Builds the prior-conversation block handed to the model with each question.
#[derive(Clone)]
pub struct ThreadContextLoader {
    history: Arc<dyn ThreadHistory>,
    limits: ContextLimits,
}

impl ThreadContextLoader {
    pub fn new(history: Arc<dyn ThreadHistory>, limits: ContextLimits) -> Self {
        Self { history, limits }
    }

    /// Never fails: an unavailable history yields an empty context.
    pub async fn load(&self, channel_id: &str, thread_ts: &str, current_ts: &str) -> String {
        if channel_id.is_empty() || thread_ts.is_empty() {
            return String::new();
        }

        let limit = self.limits.fetch_limit.clamp(1, MAX_FETCH_LIMIT);
        let messages = match self.history.replies(channel_id, thread_ts, limit).await {
            Ok(messages) => messages,
            Err(err) => {
                error!(
                    event_name = "context.thread.fetch_failed",
                    channel_id,
                    thread_ts,
                    error = %err,
                    "failed to load thread context"
                );
                return String::new();
            }
        };

        let lines = context_lines(&messages, current_ts);
        let recent = keep_recent(&lines, self.limits.max_messages);
        trim_context_lines(recent, self.limits.max_chars)
    }
}

/// `speaker: text` for every earlier, non-blank message of the thread.
pub fn context_lines(messages: &[HistoryMessage], current_ts: &str) -> Vec<String> {
    let current = ts_value(current_ts);

    messages
        .iter()
        .filter(|message| message.ts != current_ts && ts_value(&message.ts) <= current)
        .filter_map(|message| {
            let text = message.text.trim();
            if text.is_empty() {
                return None;
            }
            let speaker = if message.bot_id.as_deref().is_some_and(|id| !id.is_empty()) {
                "bot"
            } else {
                message.user.as_deref().filter(|user| !user.is_empty()).unwrap_or("unknown")
            };
            Some(format!("{speaker}: {text}"))
        })
        .collect()
}

fn keep_recent(lines: &[String], max_messages: usize) -> &[String] {
    &lines[lines.len().saturating_sub(max_messages)..]
}

// Unparseable timestamps sort after everything.
fn ts_value(ts: &str) -> f64 {
    ts.trim().parse::<f64>().ok().filter(|value| !value.is_nan()).unwrap_or(f64::INFINITY)
}

/// Keeps the newest lines whose joined length stays within `max_chars`.
pub fn trim_context_lines(lines: &[String], max_chars: usize) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut total = 0usize;

    for line in lines.iter().rev() {
        let separator = usize::from(!kept.is_empty());
        let next = line.chars().count() + separator;
        if total + next > max_chars {
            break;
        }
        kept.push(line);
        total += next;
    }

    kept.reverse();
    kept.join("\n")
}

pub fn build_model_input(question: &str, context: &str) -> String {
    if context.is_empty() {
        return question.to_string();
    }
    format!(
        "아래는 현재 스레드의 최근 대화다. 문맥을 반영해서 답변해라.\n\n\
         [스레드 최근 대화]\n{context}\n\n\
         [현재 질문]\n{question}"
    )
}
