use async_trait::async_trait;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{BotId, ConversationId},
    errors::Error,
    messaging::types::{ConversationInfo, FileUpload, InboundEvent, PostOptions},
    Result,
};

/// Outbound + session port implemented by the chat adapter.
///
/// `connect` is the only method that creates long-lived state; everything
/// else is a single request against the platform's web API.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Ask the platform who we are authenticated as.
    async fn resolve_identity(&self) -> Result<BotId>;

    /// Open the live session and start its background connection manager.
    async fn connect(&self) -> Result<Connection>;

    async fn conversation_info(&self, channel: &ConversationId) -> Result<ConversationInfo>;

    async fn post_message(
        &self,
        channel: &ConversationId,
        text: &str,
        opts: PostOptions,
    ) -> Result<()>;

    async fn upload_file(&self, channel: &ConversationId, file: FileUpload) -> Result<()>;
}

/// Handle to one live session.
///
/// Owns the inbound event queue and the background task that keeps the
/// physical connection alive (handshake, keepalive, reconnect). Dropping the
/// handle stops that task; `disconnect` additionally waits for it to finish.
#[derive(Debug)]
pub struct Connection {
    events: mpsc::Receiver<InboundEvent>,
    shutdown: CancellationToken,
    manager: Option<JoinHandle<()>>,
}

impl Connection {
    pub fn new(
        events: mpsc::Receiver<InboundEvent>,
        shutdown: CancellationToken,
        manager: JoinHandle<()>,
    ) -> Self {
        Self {
            events,
            shutdown,
            manager: Some(manager),
        }
    }

    /// Next inbound event, or `None` once the stream has closed.
    pub async fn next_event(&mut self) -> Option<InboundEvent> {
        self.events.recv().await
    }

    /// Stop the connection manager and wait for it to wind down.
    pub async fn disconnect(mut self) -> Result<()> {
        self.shutdown.cancel();
        self.events.close();
        if let Some(manager) = self.manager.take() {
            manager
                .await
                .map_err(|e| Error::External(format!("connection manager task failed: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
