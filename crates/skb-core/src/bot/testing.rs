//! Hand-rolled fakes for the messaging and executor ports.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{BotId, ConversationId, Platform, ThreadTs, UserId},
    errors::Error,
    messaging::{
        port::{Connection, MessagingPort},
        types::{ConversationInfo, FileUpload, InboundEvent, MessageEvent, PostOptions},
    },
    ports::Executor,
    Result,
};

pub(crate) fn message(channel: &str, text: &str, thread_ts: Option<&str>) -> MessageEvent {
    message_from("U777", channel, text, thread_ts)
}

pub(crate) fn message_from(
    user: &str,
    channel: &str,
    text: &str,
    thread_ts: Option<&str>,
) -> MessageEvent {
    MessageEvent {
        user: UserId(user.to_string()),
        channel: ConversationId(channel.to_string()),
        text: text.to_string(),
        thread_ts: thread_ts.map(|ts| ThreadTs(ts.to_string())),
    }
}

#[derive(Default)]
pub(crate) struct FakePort {
    pub(crate) identity: Option<String>,
    pub(crate) conversations: HashMap<String, ConversationInfo>,
    pub(crate) events: Mutex<Option<mpsc::Receiver<InboundEvent>>>,
    pub(crate) fail_post: bool,
    pub(crate) fail_upload: bool,
    pub(crate) identity_calls: Mutex<usize>,
    pub(crate) connects: Mutex<usize>,
    pub(crate) manager_stopped: Arc<AtomicBool>,
    pub(crate) lookups: Mutex<Vec<String>>,
    pub(crate) posts: Mutex<Vec<(ConversationId, String, PostOptions)>>,
    pub(crate) uploads: Mutex<Vec<(ConversationId, FileUpload)>>,
}

impl FakePort {
    pub(crate) fn new() -> Self {
        Self {
            identity: Some("U123".to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn without_identity(mut self) -> Self {
        self.identity = None;
        self
    }

    pub(crate) fn with_channel(mut self, id: &str, name: &str, private: bool) -> Self {
        self.conversations.insert(
            id.to_string(),
            ConversationInfo {
                is_channel: !private,
                is_private: private,
                name: name.to_string(),
            },
        );
        self
    }

    pub(crate) fn with_direct(mut self, id: &str) -> Self {
        self.conversations
            .insert(id.to_string(), ConversationInfo::default());
        self
    }

    /// Queue `events`; the stream closes once they are drained.
    pub(crate) fn with_events(self, events: Vec<InboundEvent>) -> Self {
        let (port, tx) = self.with_open_stream(events);
        drop(tx);
        port
    }

    /// Queue `events` and keep the stream open while the sender lives.
    pub(crate) fn with_open_stream(
        self,
        events: Vec<InboundEvent>,
    ) -> (Self, mpsc::Sender<InboundEvent>) {
        let (tx, rx) = mpsc::channel(events.len() + 1);
        for ev in events {
            tx.try_send(ev).unwrap();
        }
        *self.events.lock().unwrap() = Some(rx);
        (self, tx)
    }

    pub(crate) fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub(crate) fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub(crate) fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingPort for FakePort {
    async fn resolve_identity(&self) -> Result<BotId> {
        *self.identity_calls.lock().unwrap() += 1;
        self.identity
            .clone()
            .map(BotId)
            .ok_or_else(|| Error::External("auth.test failed: invalid_auth".to_string()))
    }

    async fn connect(&self) -> Result<Connection> {
        *self.connects.lock().unwrap() += 1;
        let rx = self
            .events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::External("no event stream queued".to_string()))?;

        let shutdown = CancellationToken::new();
        let observed = shutdown.clone();
        let stopped = self.manager_stopped.clone();
        let manager = tokio::spawn(async move {
            observed.cancelled().await;
            stopped.store(true, Ordering::SeqCst);
        });
        Ok(Connection::new(rx, shutdown, manager))
    }

    async fn conversation_info(&self, channel: &ConversationId) -> Result<ConversationInfo> {
        self.lookups.lock().unwrap().push(channel.0.clone());
        self.conversations
            .get(channel.as_str())
            .cloned()
            .ok_or_else(|| Error::External("conversations.info failed: channel_not_found".into()))
    }

    async fn post_message(
        &self,
        channel: &ConversationId,
        text: &str,
        opts: PostOptions,
    ) -> Result<()> {
        if self.fail_post {
            return Err(Error::External("chat.postMessage failed: not_in_channel".into()));
        }
        self.posts
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string(), opts));
        Ok(())
    }

    async fn upload_file(&self, channel: &ConversationId, file: FileUpload) -> Result<()> {
        if self.fail_upload {
            return Err(Error::External("files.completeUploadExternal failed: x".into()));
        }
        self.uploads.lock().unwrap().push((channel.clone(), file));
        Ok(())
    }
}

/// Executor returning a fixed response and recording every call.
pub(crate) struct FakeExecutor {
    response: String,
    pub(crate) calls: Mutex<Vec<(Platform, bool, String)>>,
    /// Signalled when `execute` is entered.
    started: Option<Arc<Notify>>,
    /// `execute` waits on this before returning.
    release: Option<Arc<Notify>>,
}

impl FakeExecutor {
    pub(crate) fn returning(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: Mutex::new(Vec::new()),
            started: None,
            release: None,
        }
    }

    /// Blocks each call until `release` is notified.
    pub(crate) fn gated(
        response: impl Into<String>,
        started: Arc<Notify>,
        release: Arc<Notify>,
    ) -> Self {
        Self {
            started: Some(started),
            release: Some(release),
            ..Self::returning(response)
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn execute(&self, platform: Platform, authorized: bool, request: &str) -> String {
        self.calls
            .lock()
            .unwrap()
            .push((platform, authorized, request.to_string()));
        if let Some(started) = &self.started {
            started.notify_one();
        }
        if let Some(release) = &self.release {
            release.notified().await;
        }
        self.response.clone()
    }
}
