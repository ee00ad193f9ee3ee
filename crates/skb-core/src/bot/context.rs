use crate::{
    domain::{ConversationId, ThreadTs},
    messaging::types::MessageEvent,
};

/// Per-message state, built fresh for every eligible inbound message.
///
/// The authorization flag is fixed at construction; the request/response
/// pair is filled in once by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageContext {
    channel: ConversationId,
    text: String,
    thread_ts: Option<ThreadTs>,
    authorized: bool,
    request: String,
    response: String,
}

impl MessageContext {
    pub fn new(event: &MessageEvent, authorized: bool) -> Self {
        Self {
            channel: event.channel.clone(),
            text: event.text.clone(),
            thread_ts: event.thread_ts.clone(),
            authorized,
            request: String::new(),
            response: String::new(),
        }
    }

    pub fn channel(&self) -> &ConversationId {
        &self.channel
    }

    /// Raw message text, mention prefix included.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn thread_ts(&self) -> Option<&ThreadTs> {
        self.thread_ts.as_ref()
    }

    /// Whether the message arrived on the configured home conversation.
    pub fn authorized(&self) -> bool {
        self.authorized
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub(crate) fn record_exchange(&mut self, request: String, response: String) {
        self.request = request;
        self.response = response;
    }
}
