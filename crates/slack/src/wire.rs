//! Socket Mode frames as Slack sends them over the WebSocket.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{AppMentionEvent, MessageEvent, SlackEnvelope, SlackEvent};

#[derive(Debug, Error)]
#[error("malformed socket mode frame: {0}")]
pub struct WireError(#[from] serde_json::Error);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Hello,
    /// Slack is about to drop this connection and wants a fresh one.
    Disconnect { reason: Option<String> },
    Envelope(SlackEnvelope),
    Other { frame_type: String },
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    payload: Option<RawPayload>,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default)]
    event: Option<RawEvent>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEvent {
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

/// Sent back for every envelope so Slack does not redeliver it.
#[derive(Debug, Serialize)]
pub struct Acknowledge<'a> {
    pub envelope_id: &'a str,
}

pub fn parse_frame(text: &str) -> Result<Frame, WireError> {
    let raw: RawFrame = serde_json::from_str(text)?;

    match raw.frame_type.as_str() {
        "hello" => return Ok(Frame::Hello),
        "disconnect" => return Ok(Frame::Disconnect { reason: raw.reason }),
        _ => {}
    }

    // Anything carrying an envelope id must be acknowledged, even if unhandled.
    let Some(envelope_id) = raw.envelope_id.filter(|id| !id.is_empty()) else {
        return Ok(Frame::Other { frame_type: raw.frame_type });
    };

    let event = match (raw.frame_type.as_str(), raw.payload.and_then(|payload| payload.event)) {
        ("events_api", Some(event)) => into_event(event),
        (frame_type, _) => SlackEvent::Unsupported { event_type: frame_type.to_owned() },
    };

    Ok(Frame::Envelope(SlackEnvelope { envelope_id, event }))
}

fn into_event(raw: RawEvent) -> SlackEvent {
    match raw.event_type.as_str() {
        "app_mention" => SlackEvent::AppMention(AppMentionEvent {
            channel_id: raw.channel.unwrap_or_default(),
            user_id: raw.user,
            text: raw.text.unwrap_or_default(),
            ts: raw.ts.unwrap_or_default(),
            thread_ts: raw.thread_ts,
        }),
        "message" => SlackEvent::Message(MessageEvent {
            channel_id: raw.channel.unwrap_or_default(),
            user_id: raw.user,
            subtype: raw.subtype,
            ts: raw.ts.unwrap_or_default(),
            thread_ts: raw.thread_ts,
        }),
        _ => SlackEvent::Unsupported { event_type: raw.event_type },
    }
}
