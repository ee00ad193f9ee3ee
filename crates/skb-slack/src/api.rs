//! Thin Slack Web API client over `reqwest`.

use std::time::Duration;

use reqwest::{header::HeaderMap, Response, StatusCode};
use serde_json::{json, Value};

use skb_core::{
    domain::{BotId, ConversationId},
    errors::Error,
    messaging::types::{ConversationInfo, FileUpload, PostOptions},
    Result,
};

pub const DEFAULT_API_URL: &str = "https://slack.com/api/";

/// Slack error codes meaning the token itself is unusable.
const AUTH_ERRORS: &[&str] = &[
    "invalid_auth",
    "not_authed",
    "account_inactive",
    "token_revoked",
    "token_expired",
];

#[derive(Clone, Debug)]
pub struct SlackApi {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl SlackApi {
    pub fn new(token: impl Into<String>, api_url: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::External(format!("slack http client: {e}")))?;
        Ok(Self {
            http,
            token: token.into(),
            base_url: normalize_base(api_url.unwrap_or(DEFAULT_API_URL)),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}{method}", self.base_url)
    }

    async fn post_json(&self, method: &str, body: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(self.endpoint(method))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| map_err(method, e))?;
        read_response(method, resp).await
    }

    async fn post_form(&self, method: &str, form: &[(&str, &str)]) -> Result<Value> {
        let resp = self
            .http
            .post(self.endpoint(method))
            .bearer_auth(&self.token)
            .form(form)
            .send()
            .await
            .map_err(|e| map_err(method, e))?;
        read_response(method, resp).await
    }

    /// `auth.test`: who does this token belong to.
    pub async fn auth_test(&self) -> Result<BotId> {
        let v = self.post_form("auth.test", &[]).await?;
        let user_id = v
            .get("user_id")
            .and_then(|u| u.as_str())
            .ok_or_else(|| Error::External("auth.test: no user_id in response".to_string()))?;
        Ok(BotId(user_id.to_string()))
    }

    /// `rtm.connect`: WebSocket URL for a new real-time session.
    pub async fn rtm_connect(&self) -> Result<String> {
        let v = self.post_form("rtm.connect", &[]).await?;
        v.get("url")
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::External("rtm.connect: no url in response".to_string()))
    }

    pub async fn conversations_info(&self, channel: &ConversationId) -> Result<ConversationInfo> {
        let v = self
            .post_form(
                "conversations.info",
                &[("channel", channel.as_str()), ("include_locale", "true")],
            )
            .await?;
        let chan = v
            .get("channel")
            .ok_or_else(|| Error::External("conversations.info: no channel in response".into()))?;
        Ok(parse_conversation(chan))
    }

    pub async fn chat_post_message(
        &self,
        channel: &ConversationId,
        text: &str,
        opts: &PostOptions,
    ) -> Result<()> {
        self.post_json("chat.postMessage", &post_message_body(channel, text, opts))
            .await?;
        Ok(())
    }

    /// Three-step external upload: reserve, transfer, share into `channel`.
    pub async fn upload_file(&self, channel: &ConversationId, file: &FileUpload) -> Result<()> {
        let length = file.content.len().to_string();
        let reserved = self
            .post_form(
                "files.getUploadURLExternal",
                &[("filename", file.filename.as_str()), ("length", length.as_str())],
            )
            .await?;
        let upload_url = str_field(&reserved, "upload_url", "files.getUploadURLExternal")?;
        let file_id = str_field(&reserved, "file_id", "files.getUploadURLExternal")?;

        let resp = self
            .http
            .post(upload_url)
            .body(file.content.clone())
            .send()
            .await
            .map_err(|e| map_err("file upload", e))?;
        if !resp.status().is_success() {
            return Err(Error::External(format!(
                "file upload failed: HTTP {}",
                resp.status()
            )));
        }

        let complete = json!({
            "files": [{ "id": file_id, "title": file.title }],
            "channel_id": channel.as_str(),
        });
        self.post_json("files.completeUploadExternal", &complete)
            .await?;
        Ok(())
    }
}

fn normalize_base(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

fn map_err(method: &str, e: reqwest::Error) -> Error {
    Error::External(format!("{method} request error: {e}"))
}

async fn read_response(method: &str, resp: Response) -> Result<Value> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited {
            retry_after: retry_after(resp.headers()),
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::External(format!(
            "{method} failed: HTTP {status} {}",
            body.chars().take(200).collect::<String>()
        )));
    }
    let v: Value = resp
        .json()
        .await
        .map_err(|e| Error::External(format!("{method} json error: {e}")))?;
    check_ok(method, v)
}

/// Slack reports failures in-band as `{"ok": false, "error": "..."}`.
pub(crate) fn check_ok(method: &str, v: Value) -> Result<Value> {
    if v.get("ok").and_then(|ok| ok.as_bool()) == Some(true) {
        return Ok(v);
    }
    let code = v
        .get("error")
        .and_then(|e| e.as_str())
        .unwrap_or("unknown");
    if AUTH_ERRORS.contains(&code) {
        return Err(Error::InvalidAuth);
    }
    if code == "ratelimited" {
        return Err(Error::RateLimited { retry_after: None });
    }
    Err(Error::External(format!("{method} failed: {code}")))
}

pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

pub(crate) fn parse_conversation(chan: &Value) -> ConversationInfo {
    let flag = |k: &str| chan.get(k).and_then(|v| v.as_bool()).unwrap_or(false);
    ConversationInfo {
        is_channel: flag("is_channel"),
        is_private: flag("is_private") || flag("is_group"),
        name: chan
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    }
}

pub(crate) fn post_message_body(channel: &ConversationId, text: &str, opts: &PostOptions) -> Value {
    let mut body = json!({
        "channel": channel.as_str(),
        "text": text,
        "as_user": opts.as_user,
    });
    if let Some(ts) = &opts.thread_ts {
        body["thread_ts"] = json!(ts.as_str());
    }
    body
}

fn str_field<'v>(v: &'v Value, key: &str, method: &str) -> Result<&'v str> {
    v.get(key)
        .and_then(|x| x.as_str())
        .ok_or_else(|| Error::External(format!("{method}: no {key} in response")))
}
