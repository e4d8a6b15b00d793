//! Slack Socket Mode interface for Boxer.
//!
//! - **Wire** (`wire`) - Socket Mode frame parsing and acknowledgements
//! - **Events** (`events`) - envelope model, dispatcher and handlers
//! - **Socket Mode** (`socket`) - reconnecting runner and the WebSocket transport
//! - **Web API** (`api`) - `chat.postMessage`, `conversations.replies`, `apps.connections.open`
//!
//! ```text
//! WebSocket → parse_frame → ack → EventDispatcher → MentionService
//!                                                     ↓
//!                        chat.postMessage ← MessageSender ← Reply
//! ```

pub mod api;
pub mod events;
pub mod socket;
pub mod wire;

pub use api::{MessageSender, SlackApiClient, SlackApiError};
pub use events::{
    AppMentionEvent, EventContext, EventDispatcher, EventHandlerError, HandlerResult,
    MentionService, SlackEnvelope, SlackEvent,
};
pub use socket::{ReconnectPolicy, SocketModeRunner, SocketTransport, TransportError, WebSocketTransport};
