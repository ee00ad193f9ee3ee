use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    bot::{dispatch::CommandDispatcher, filter::AuthorizationFilter, sender::ResponseSender},
    config::Config,
    domain::BotId,
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{InboundEvent, MessageEvent},
    },
    ports::Executor,
    Result,
};

/// Listens for messages, runs them through the executor and sends back the
/// result.
///
/// Owns the connection lifecycle: resolve identity, open the live session,
/// drain inbound events one at a time until shutdown, stream closure, or
/// rejected credentials.
pub struct SlackBot {
    cfg: Arc<Config>,
    port: Arc<dyn MessagingPort>,
    executor: Arc<dyn Executor>,
}

impl SlackBot {
    pub fn new(cfg: Arc<Config>, port: Arc<dyn MessagingPort>, executor: Arc<dyn Executor>) -> Self {
        Self {
            cfg,
            port,
            executor,
        }
    }

    /// Run until `cancel` fires, the event stream closes, or the platform
    /// rejects our credentials.
    ///
    /// Cancellation is only observed between events; a message being handled
    /// is always finished first.
    pub async fn start(&self, cancel: CancellationToken) -> Result<()> {
        info!("Starting bot");
        let bot_id = self.resolve_bot_id().await?;
        info!(bot_id = %bot_id, "resolved bot identity");

        let mut connection = self.port.connect().await?;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Shutdown requested. Finishing...");
                    return connection.disconnect().await;
                }
                event = connection.next_event() => {
                    let Some(event) = event else {
                        info!("Incoming events channel closed. Finishing...");
                        return Ok(());
                    };
                    self.handle_event(&bot_id, event).await?;
                }
            }
        }
    }

    async fn resolve_bot_id(&self) -> Result<BotId> {
        if let Some(id) = self.cfg.preset_bot_id() {
            return Ok(BotId(id.to_string()));
        }
        self.port
            .resolve_identity()
            .await
            .map_err(|e| Error::Identity(e.to_string()))
    }

    /// Act on one inbound event. Only rejected credentials are returned as an
    /// error; everything else is logged.
    async fn handle_event(&self, bot_id: &BotId, event: InboundEvent) -> Result<()> {
        let kind = event.kind();
        match event {
            InboundEvent::Connected => {
                info!(event = kind, "connected to Slack");
            }
            InboundEvent::Message(msg) => {
                if msg.user == *bot_id {
                    debug!(channel = %msg.channel, "skipping own message");
                    return Ok(());
                }
                if let Err(e) = self.handle_message(bot_id, &msg).await {
                    let e = e.context("while handling message");
                    error!(channel = %msg.channel, "{e}");
                }
            }
            InboundEvent::RateLimited { retry_after } => {
                error!(event = kind, retry_after = ?retry_after, "Slack rate limiting error");
            }
            InboundEvent::UnmarshallingError(e) => {
                error!(event = kind, "Slack unmarshalling error: {e}");
            }
            InboundEvent::OutgoingError(e) => {
                error!(event = kind, "Slack outgoing event error: {e}");
            }
            InboundEvent::IncomingError(e) => {
                error!(event = kind, "Slack incoming event error: {e}");
            }
            InboundEvent::ConnectionError(e) => {
                error!(event = kind, "Slack connection error: {e}");
            }
            InboundEvent::InvalidAuth => {
                error!(event = kind, "Slack rejected the credentials");
                return Err(Error::InvalidAuth);
            }
        }
        Ok(())
    }

    /// Filter, dispatch and reply for a single message.
    async fn handle_message(&self, bot_id: &BotId, msg: &MessageEvent) -> Result<()> {
        let filter = AuthorizationFilter::new(&self.cfg.slack_channel, bot_id);
        let Some(mut ctx) = filter.evaluate(self.port.as_ref(), msg).await else {
            return Ok(());
        };

        CommandDispatcher::new(self.executor.as_ref(), bot_id)
            .dispatch(&mut ctx)
            .await;

        ResponseSender::new(self.port.as_ref())
            .send(&ctx)
            .await
            .map_err(|e| e.context("while sending message"))
    }
}
