use std::time::Duration;

use crate::domain::{ConversationId, ThreadTs, UserId};

/// Everything the live connection can hand to the supervisor.
///
/// The set is closed: adding a kind forces every `match` in the supervisor to
/// decide what to do with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    /// Handshake completed; informational.
    Connected,
    Message(MessageEvent),
    RateLimited { retry_after: Option<Duration> },
    UnmarshallingError(String),
    OutgoingError(String),
    IncomingError(String),
    ConnectionError(String),
    /// Credentials were rejected; the session cannot recover.
    InvalidAuth,
}

impl InboundEvent {
    /// Short lowercase label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Connected => "connected",
            InboundEvent::Message(_) => "message",
            InboundEvent::RateLimited { .. } => "rate_limited",
            InboundEvent::UnmarshallingError(_) => "unmarshalling_error",
            InboundEvent::OutgoingError(_) => "outgoing_error",
            InboundEvent::IncomingError(_) => "incoming_error",
            InboundEvent::ConnectionError(_) => "connection_error",
            InboundEvent::InvalidAuth => "invalid_auth",
        }
    }
}

/// A plain chat message as delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub user: UserId,
    pub channel: ConversationId,
    pub text: String,
    /// Set when the message was posted inside a thread.
    pub thread_ts: Option<ThreadTs>,
}

/// Conversation metadata returned by the best-effort lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationInfo {
    pub is_channel: bool,
    pub is_private: bool,
    pub name: String,
}

/// Options for an inline reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostOptions {
    /// Post as the authenticated bot user.
    pub as_user: bool,
    /// Reply inside this thread instead of at the top level.
    pub thread_ts: Option<ThreadTs>,
}

/// A text payload delivered as a file attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub title: String,
    pub content: String,
}
