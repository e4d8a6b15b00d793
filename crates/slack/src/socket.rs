use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use thiserror::Error;
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::api::{MessageSender, SlackApiClient};
use crate::events::{EventContext, EventDispatcher, HandlerResult, SlackEnvelope};
use crate::wire::{parse_frame, Acknowledge, Frame};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `Ok(None)` ends the runner; errors trigger a reconnect.
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: EventDispatcher,
    sender: Arc<dyn MessageSender>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        sender: Arc<dyn MessageSender>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, sender, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        let max_retries = self.reconnect_policy.max_retries;
        let mut attempt = 0;

        loop {
            info!(attempt, "opening socket mode transport connection");
            let failure = match self.transport.connect().await {
                Ok(()) => {
                    info!(attempt, "socket mode transport connected");
                    attempt = 0;
                    match self.pump().await {
                        Ok(()) => return Ok(()),
                        Err(error) => error,
                    }
                }
                Err(error) => error,
            };

            warn!(attempt, max_retries, error = %failure, "socket mode transport failed");

            if attempt >= max_retries {
                warn!(max_retries, "socket mode retries exhausted; continuing process without crash");
                return Ok(());
            }

            let delay = self.reconnect_policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn pump(&self) -> Result<(), TransportError> {
        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!("socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };
            let (channel_id, thread_ts) = envelope.event.location();
            let channel_id = channel_id.unwrap_or("unknown");
            let thread_ts = thread_ts.unwrap_or("unknown");

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                channel_id,
                thread_ts,
                "received slack envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    "acknowledged slack envelope"
                );
            }

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Responded(reply)) => {
                    if let Err(error) = self.sender.post_reply(&reply).await {
                        warn!(
                            event_name = "egress.slack.reply_failed",
                            envelope_id = %envelope.envelope_id,
                            channel_id = %reply.channel_id,
                            thread_ts = %reply.thread_ts,
                            error = %error,
                            "failed to post reply; continuing socket loop"
                        );
                    }
                }
                Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
                Err(error) => {
                    warn!(
                        envelope_id = %envelope.envelope_id,
                        channel_id,
                        thread_ts,
                        error = %error,
                        "event dispatch failed; continuing socket loop"
                    );
                }
            }
        }
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket Mode over a real WebSocket, opened through `apps.connections.open`.
pub struct WebSocketTransport {
    api: Arc<SlackApiClient>,
    app_token: SecretString,
    stream: Mutex<Option<WsStream>>,
}

impl WebSocketTransport {
    pub fn new(api: Arc<SlackApiClient>, app_token: SecretString) -> Self {
        Self { api, app_token, stream: Mutex::new(None) }
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self
            .api
            .apps_connections_open(&self.app_token)
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        *self.stream.lock().await = Some(stream);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Receive("not connected".to_owned()));
        };

        loop {
            let message = match stream.next().await {
                None => return Err(TransportError::Receive("stream ended".to_owned())),
                Some(Err(error)) => return Err(TransportError::Receive(error.to_string())),
                Some(Ok(message)) => message,
            };

            match message {
                Message::Text(text) => match parse_frame(&text) {
                    Ok(Frame::Envelope(envelope)) => return Ok(Some(envelope)),
                    Ok(Frame::Hello) => debug!("socket mode hello received"),
                    Ok(Frame::Disconnect { reason }) => {
                        let reason = reason.unwrap_or_else(|| "unspecified".to_owned());
                        info!(reason = %reason, "slack requested socket mode disconnect");
                        return Err(TransportError::Receive(format!("disconnect requested: {reason}")));
                    }
                    Ok(Frame::Other { frame_type }) => {
                        debug!(frame_type = %frame_type, "skipping socket mode frame")
                    }
                    Err(error) => warn!(error = %error, "skipping unparseable socket mode frame"),
                },
                Message::Ping(data) => stream
                    .send(Message::Pong(data))
                    .await
                    .map_err(|error| TransportError::Receive(error.to_string()))?,
                Message::Close(_) => {
                    return Err(TransportError::Receive("closed by server".to_owned()))
                }
                _ => {}
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let body = serde_json::to_string(&Acknowledge { envelope_id })
            .map_err(|error| TransportError::Acknowledge(error.to_string()))?;
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Acknowledge("not connected".to_owned()));
        };
        stream
            .send(Message::Text(body))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(mut stream) = self.stream.lock().await.take() else {
            return Ok(());
        };
        stream.close(None).await.map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use super::{ReconnectPolicy, SocketModeRunner, SocketTransport, TransportError};
    use crate::api::{MessageSender, SlackApiError};
    use crate::events::{
        AppMentionEvent, EventContext, EventDispatcher, EventHandlerError, MentionService,
        SlackEnvelope, SlackEvent,
    };
    use async_trait::async_trait;
    use boxer_core::domain::mention::{InboundMention, Reply};
    use tokio::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
        journal: Journal,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        envelopes: VecDeque<Result<Option<SlackEnvelope>, TransportError>>,
        connect_attempts: usize,
        disconnect_calls: usize,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            envelopes: Vec<Result<Option<SlackEnvelope>, TransportError>>,
            journal: Journal,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    ..ScriptedState::default()
                }),
                journal,
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn disconnect_calls(&self) -> usize {
            self.state.lock().await.disconnect_calls
        }
    }

    #[async_trait]
    impl SocketTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
            let mut state = self.state.lock().await;
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
            self.journal.lock().await.push(format!("ack:{envelope_id}"));
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            self.state.lock().await.disconnect_calls += 1;
            Ok(())
        }
    }

    struct RecordingSender {
        journal: Journal,
        fail: bool,
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn post_reply(&self, reply: &Reply) -> Result<(), SlackApiError> {
            self.journal.lock().await.push(format!("post:{}:{}", reply.thread_ts, reply.text));
            if self.fail {
                return Err(SlackApiError::Api {
                    method: "chat.postMessage",
                    error: "channel_not_found".to_owned(),
                });
            }
            Ok(())
        }
    }

    struct EchoService;

    #[async_trait]
    impl MentionService for EchoService {
        async fn handle_mention(
            &self,
            mention: &InboundMention,
            _ctx: &EventContext,
        ) -> Result<Reply, EventHandlerError> {
            Ok(mention.reply(format!("echo {}", mention.raw_text)))
        }
    }

    fn unsupported(envelope_id: &str) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(Some(SlackEnvelope {
            envelope_id: envelope_id.to_owned(),
            event: SlackEvent::Unsupported { event_type: "test".to_owned() },
        }))
    }

    fn mention(envelope_id: &str, text: &str) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(Some(SlackEnvelope {
            envelope_id: envelope_id.to_owned(),
            event: SlackEvent::AppMention(AppMentionEvent {
                channel_id: "C1".to_owned(),
                user_id: Some("U1".to_owned()),
                text: text.to_owned(),
                ts: "1730000000.2000".to_owned(),
                thread_ts: Some("1730000000.1000".to_owned()),
            }),
        }))
    }

    fn instant_policy() -> ReconnectPolicy {
        ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 }
    }

    fn runner(
        transport: Arc<ScriptedTransport>,
        journal: Journal,
        fail_posts: bool,
    ) -> SocketModeRunner {
        SocketModeRunner::new(
            transport,
            EventDispatcher::for_mentions(EchoService),
            Arc::new(RecordingSender { journal, fail: fail_posts }),
            instant_policy(),
        )
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let journal = Journal::default();
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![unsupported("env-1"), Ok(None)],
            journal.clone(),
        ));

        runner(transport.clone(), journal.clone(), false)
            .start()
            .await
            .expect("runner should not fail");

        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(transport.disconnect_calls().await, 1);
        assert_eq!(*journal.lock().await, vec!["ack:env-1"]);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let journal = Journal::default();
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
            journal.clone(),
        ));

        runner(transport.clone(), journal, false)
            .start()
            .await
            .expect("runner should degrade gracefully");
        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn retry_budget_resets_after_a_successful_connection() {
        let journal = Journal::default();
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Ok(()),
                Err(TransportError::Connect("fail-3".to_owned())),
                Ok(()),
            ],
            vec![
                Err(TransportError::Receive("disconnect requested: refresh_requested".to_owned())),
                unsupported("env-after-reconnect"),
                Ok(None),
            ],
            journal.clone(),
        ));

        runner(transport.clone(), journal.clone(), false).start().await.expect("runner");

        assert_eq!(transport.connect_attempts().await, 5);
        assert_eq!(*journal.lock().await, vec!["ack:env-after-reconnect"]);
    }

    #[tokio::test]
    async fn acknowledges_before_posting_the_reply() {
        let journal = Journal::default();
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![mention("env-1", "ping"), Ok(None)],
            journal.clone(),
        ));

        runner(transport, journal.clone(), false).start().await.expect("runner");

        assert_eq!(*journal.lock().await, vec!["ack:env-1", "post:1730000000.1000:echo ping"]);
    }

    #[tokio::test]
    async fn post_failures_keep_the_loop_alive() {
        let journal = Journal::default();
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![mention("env-1", "first"), mention("env-2", "second"), Ok(None)],
            journal.clone(),
        ));

        runner(transport.clone(), journal.clone(), true).start().await.expect("runner");

        assert_eq!(
            *journal.lock().await,
            vec![
                "ack:env-1",
                "post:1730000000.1000:echo first",
                "ack:env-2",
                "post:1730000000.1000:echo second",
            ]
        );
        assert_eq!(transport.connect_attempts().await, 1);
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = ReconnectPolicy { max_retries: 5, base_delay_ms: 250, max_delay_ms: 1_000 };
        assert_eq!(policy.backoff(0).as_millis(), 250);
        assert_eq!(policy.backoff(1).as_millis(), 500);
        assert_eq!(policy.backoff(2).as_millis(), 1_000);
        assert_eq!(policy.backoff(30).as_millis(), 1_000);
    }
}
