use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use boxer_core::domain::mention::{InboundMention, Reply};
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    AppMention(AppMentionEvent),
    Message(MessageEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::AppMention(_) => SlackEventType::AppMention,
            Self::Message(_) => SlackEventType::Message,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }

    /// Channel and thread the event belongs to, for log correlation.
    pub fn location(&self) -> (Option<&str>, Option<&str>) {
        match self {
            Self::AppMention(event) => {
                (Some(event.channel_id.as_str()), Some(event.thread_ts().as_str()))
            }
            Self::Message(event) => (
                Some(event.channel_id.as_str()),
                Some(event.thread_ts.as_deref().unwrap_or(event.ts.as_str())),
            ),
            Self::Unsupported { .. } => (None, None),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    AppMention,
    Message,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppMentionEvent {
    pub channel_id: String,
    pub user_id: Option<String>,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
}

impl AppMentionEvent {
    fn thread_ts(&self) -> &String {
        self.thread_ts.as_ref().filter(|ts| !ts.is_empty()).unwrap_or(&self.ts)
    }

    pub fn to_mention(&self) -> InboundMention {
        InboundMention::new(
            self.text.clone(),
            self.user_id.clone(),
            self.channel_id.clone(),
            self.ts.clone(),
            self.thread_ts.clone(),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: Option<String>,
    pub subtype: Option<String>,
    pub ts: String,
    pub thread_ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(Reply),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("mention handler failure: {0}")]
    Mention(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mention handling plus a handler that swallows plain channel messages.
    pub fn for_mentions<S>(service: S) -> Self
    where
        S: MentionService + 'static,
    {
        let mut dispatcher = Self::new();
        dispatcher.register(AppMentionHandler::new(service));
        dispatcher.register(MessageHandler);
        dispatcher
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

#[async_trait]
pub trait MentionService: Send + Sync {
    async fn handle_mention(
        &self,
        mention: &InboundMention,
        ctx: &EventContext,
    ) -> Result<Reply, EventHandlerError>;
}

pub struct AppMentionHandler<S> {
    service: S,
}

impl<S> AppMentionHandler<S>
where
    S: MentionService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for AppMentionHandler<S>
where
    S: MentionService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::AppMention
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::AppMention(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let reply = self.service.handle_mention(&event.to_mention(), ctx).await?;
        if reply.text.is_empty() {
            return Ok(HandlerResult::Processed);
        }
        Ok(HandlerResult::Responded(reply))
    }
}

/// Plain `message` events are acknowledged and dropped.
pub struct MessageHandler;

#[async_trait]
impl EventHandler for MessageHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Message
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        if let SlackEvent::Message(event) = &envelope.event {
            debug!(
                event_name = "ingress.slack.message_ignored",
                correlation_id = %ctx.correlation_id,
                channel_id = %event.channel_id,
                subtype = event.subtype.as_deref().unwrap_or("none"),
                "ignoring generic message event"
            );
        }
        Ok(HandlerResult::Ignored)
    }
}
