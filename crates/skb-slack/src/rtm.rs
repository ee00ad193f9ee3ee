//! RTM connection manager: owns the WebSocket, keeps it alive and reconnects.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tokio_util::sync::CancellationToken;

use skb_core::{errors::Error, messaging::types::InboundEvent};

use crate::{
    api::SlackApi,
    events::{parse_frame, Frame},
};

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(60);

/// Exponential reconnect delay, reset once a session says hello.
#[derive(Debug)]
pub(crate) struct Backoff {
    next: Duration,
}

impl Backoff {
    pub(crate) fn new() -> Self {
        Self { next: BACKOFF_BASE }
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(BACKOFF_CAP);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.next = BACKOFF_BASE;
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Reconnect,
    ReceiverGone,
}

pub(crate) struct RtmManager {
    pub(crate) api: SlackApi,
    pub(crate) ping_interval: Duration,
    pub(crate) events: mpsc::Sender<InboundEvent>,
    pub(crate) shutdown: CancellationToken,
}

impl RtmManager {
    /// Runs until shutdown, a rejected token, or the receiver going away.
    /// Dropping `self.events` on return closes the consumer's stream.
    pub(crate) async fn run(self) {
        let mut backoff = Backoff::new();
        loop {
            let delay = match self.api.rtm_connect().await {
                Ok(url) => match self.run_session(&url, &mut backoff).await {
                    SessionEnd::Reconnect => backoff.next_delay(),
                    SessionEnd::Shutdown | SessionEnd::ReceiverGone => break,
                },
                Err(e) if e.is_fatal() => {
                    tracing::error!(error = %e, "Slack rejected the bot token");
                    self.emit(InboundEvent::InvalidAuth).await;
                    break;
                }
                Err(Error::RateLimited { retry_after }) => {
                    if !self.emit(InboundEvent::RateLimited { retry_after }).await {
                        break;
                    }
                    retry_after.unwrap_or_else(|| backoff.next_delay())
                }
                Err(e) => {
                    if !self.emit(InboundEvent::ConnectionError(e.to_string())).await {
                        break;
                    }
                    backoff.next_delay()
                }
            };

            tracing::info!(delay_secs = delay.as_secs(), "Reconnecting to Slack RTM");
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        tracing::debug!("RTM connection manager stopped");
    }

    async fn run_session(&self, url: &str, backoff: &mut Backoff) -> SessionEnd {
        let ws = match connect_async(url).await {
            Ok((ws, _)) => ws,
            Err(e) => return self.report(InboundEvent::ConnectionError(e.to_string())).await,
        };
        tracing::debug!("WebSocket connected");
        let (mut write, mut read) = ws.split();

        let mut ping = tokio::time::interval(self.ping_interval);
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ping.tick().await;
        let mut ping_id: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    let _ = write.close().await;
                    return SessionEnd::Shutdown;
                }
                msg = read.next() => match msg {
                    Some(Ok(WsMessage::Text(text))) => match parse_frame(text.as_str()) {
                        Frame::Event(event) => {
                            if event == InboundEvent::Connected {
                                tracing::info!("Connected to Slack RTM");
                                backoff.reset();
                            }
                            if !self.emit(event).await {
                                return self.stopped();
                            }
                        }
                        Frame::Goodbye => {
                            tracing::info!("Slack sent goodbye");
                            return SessionEnd::Reconnect;
                        }
                        Frame::Ignored => {}
                    },
                    Some(Ok(WsMessage::Ping(data))) => {
                        if let Err(e) = write.send(WsMessage::Pong(data)).await {
                            return self.report(InboundEvent::OutgoingError(e.to_string())).await;
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        tracing::info!(?frame, "Slack closed the WebSocket");
                        return SessionEnd::Reconnect;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return self.report(InboundEvent::IncomingError(e.to_string())).await;
                    }
                    None => {
                        return self
                            .report(InboundEvent::IncomingError("websocket stream ended".to_string()))
                            .await;
                    }
                },
                _ = ping.tick() => {
                    ping_id += 1;
                    let payload = json!({"id": ping_id, "type": "ping"}).to_string();
                    if let Err(e) = write.send(WsMessage::Text(payload.into())).await {
                        return self.report(InboundEvent::OutgoingError(e.to_string())).await;
                    }
                }
            }
        }
    }

    /// Delivers `event` unless shutdown wins the race. `false` means stop.
    async fn emit(&self, event: InboundEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }

    async fn report(&self, event: InboundEvent) -> SessionEnd {
        if self.emit(event).await {
            SessionEnd::Reconnect
        } else {
            self.stopped()
        }
    }

    fn stopped(&self) -> SessionEnd {
        if self.shutdown.is_cancelled() {
            SessionEnd::Shutdown
        } else {
            SessionEnd::ReceiverGone
        }
    }
}
