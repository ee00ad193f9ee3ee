//! Slack adapter (Web API over reqwest, RTM over tokio-tungstenite).
//!
//! This crate implements the `skb-core` MessagingPort against Slack.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub mod api;
mod events;
mod rtm;

use skb_core::{
    domain::{BotId, ConversationId},
    messaging::{
        port::{Connection, MessagingPort},
        types::{ConversationInfo, FileUpload, PostOptions},
    },
    Result,
};

use crate::{api::SlackApi, rtm::RtmManager};

const EVENT_QUEUE_CAPACITY: usize = 64;
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct SlackMessenger {
    api: SlackApi,
    ping_interval: Duration,
}

impl SlackMessenger {
    /// `api_url` overrides the Web API base (e.g. a local test server).
    pub fn new(token: impl Into<String>, api_url: Option<&str>) -> Result<Self> {
        Ok(Self {
            api: SlackApi::new(token, api_url)?,
            ping_interval: DEFAULT_PING_INTERVAL,
        })
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval.max(Duration::from_secs(1));
        self
    }
}

#[async_trait]
impl MessagingPort for SlackMessenger {
    async fn resolve_identity(&self) -> Result<BotId> {
        self.api.auth_test().await
    }

    async fn connect(&self) -> Result<Connection> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let shutdown = CancellationToken::new();
        let manager = RtmManager {
            api: self.api.clone(),
            ping_interval: self.ping_interval,
            events: tx,
            shutdown: shutdown.clone(),
        };
        let handle = tokio::spawn(manager.run());
        Ok(Connection::new(rx, shutdown, handle))
    }

    async fn conversation_info(&self, channel: &ConversationId) -> Result<ConversationInfo> {
        self.api.conversations_info(channel).await
    }

    async fn post_message(
        &self,
        channel: &ConversationId,
        text: &str,
        opts: PostOptions,
    ) -> Result<()> {
        self.api.chat_post_message(channel, text, &opts).await
    }

    async fn upload_file(&self, channel: &ConversationId, file: FileUpload) -> Result<()> {
        self.api.upload_file(channel, &file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_interval_has_a_floor() {
        let m = SlackMessenger::new("xoxb", None)
            .unwrap()
            .with_ping_interval(Duration::ZERO);
        assert_eq!(m.ping_interval, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn disconnect_stops_the_manager() {
        // rtm.connect against a closed port keeps failing; the manager sits in backoff
        let m = SlackMessenger::new("xoxb", Some("http://127.0.0.1:9/api")).unwrap();
        let mut conn = m.connect().await.unwrap();
        assert!(matches!(
            conn.next_event().await,
            Some(skb_core::messaging::types::InboundEvent::ConnectionError(_))
        ));
        conn.disconnect().await.unwrap();
    }
}
