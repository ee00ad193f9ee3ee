//! RTM frame decoding.

use serde::Deserialize;
use serde_json::Value;

use skb_core::{
    domain::{ConversationId, ThreadTs, UserId},
    messaging::types::{InboundEvent, MessageEvent},
};

/// Message subtypes that describe edits to existing messages rather than new
/// requests.
const SKIPPED_SUBTYPES: &[&str] = &["message_changed", "message_deleted", "message_replied"];

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    Event(InboundEvent),
    /// Server is about to close the socket; reconnect.
    Goodbye,
    Ignored,
}

/// Frames keyed on `type`. Only the kinds we act on are decoded; other kinds
/// carry unrelated payload shapes (user and channel objects) and are skipped
/// without looking at their fields.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TypedFrame {
    Hello,
    Goodbye,
    Error {
        #[serde(default)]
        error: Option<RawError>,
    },
    Message(RawMessage),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    subtype: Option<String>,
    user: Option<String>,
    bot_id: Option<String>,
    channel: Option<String>,
    text: Option<String>,
    thread_ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    code: Option<i64>,
    msg: Option<String>,
}

pub(crate) fn parse_frame(raw: &str) -> Frame {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return Frame::Event(InboundEvent::UnmarshallingError(e.to_string())),
    };
    // reply acks ({"ok":true,"reply_to":n}) have no type
    if !value.get("type").is_some_and(Value::is_string) {
        return Frame::Ignored;
    }
    let frame = match TypedFrame::deserialize(value) {
        Ok(f) => f,
        Err(e) => return Frame::Event(InboundEvent::UnmarshallingError(e.to_string())),
    };

    match frame {
        TypedFrame::Hello => Frame::Event(InboundEvent::Connected),
        TypedFrame::Goodbye => Frame::Goodbye,
        TypedFrame::Error { error } => {
            let detail = error
                .map(|e| {
                    format!(
                        "code {}: {}",
                        e.code.unwrap_or_default(),
                        e.msg.unwrap_or_default()
                    )
                })
                .unwrap_or_else(|| "unknown RTM error".to_string());
            Frame::Event(InboundEvent::IncomingError(detail))
        }
        TypedFrame::Message(msg) => message(msg),
        TypedFrame::Other => Frame::Ignored,
    }
}

fn message(msg: RawMessage) -> Frame {
    if msg
        .subtype
        .as_deref()
        .is_some_and(|s| SKIPPED_SUBTYPES.contains(&s))
    {
        return Frame::Ignored;
    }
    let Some(channel) = msg.channel else {
        return Frame::Ignored;
    };
    // bot_message frames carry bot_id instead of user
    let user = msg.user.or(msg.bot_id).unwrap_or_default();
    Frame::Event(InboundEvent::Message(MessageEvent {
        user: UserId(user),
        channel: ConversationId(channel),
        text: msg.text.unwrap_or_default(),
        thread_ts: msg.thread_ts.map(ThreadTs),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_and_goodbye() {
        assert_eq!(
            parse_frame(r#"{"type":"hello"}"#),
            Frame::Event(InboundEvent::Connected)
        );
        assert_eq!(parse_frame(r#"{"type":"goodbye"}"#), Frame::Goodbye);
    }

    #[test]
    fn plain_message_in_thread() {
        let frame = parse_frame(
            r#"{"type":"message","user":"U1","channel":"C1","text":"<@U9> get pods","ts":"2.0","thread_ts":"1.0"}"#,
        );
        assert_eq!(
            frame,
            Frame::Event(InboundEvent::Message(MessageEvent {
                user: UserId("U1".into()),
                channel: ConversationId("C1".into()),
                text: "<@U9> get pods".into(),
                thread_ts: Some(ThreadTs("1.0".into())),
            }))
        );
    }

    #[test]
    fn edits_and_deletes_are_ignored() {
        for sub in SKIPPED_SUBTYPES {
            let raw = format!(r#"{{"type":"message","subtype":"{sub}","channel":"C1"}}"#);
            assert_eq!(parse_frame(&raw), Frame::Ignored, "subtype {sub}");
        }
    }

    #[test]
    fn bot_message_uses_bot_id_as_author() {
        let frame = parse_frame(
            r#"{"type":"message","subtype":"bot_message","bot_id":"B1","channel":"C1","text":"hi"}"#,
        );
        let Frame::Event(InboundEvent::Message(msg)) = frame else {
            panic!("expected a message frame");
        };
        assert_eq!(msg.user, UserId("B1".into()));
        assert_eq!(msg.thread_ts, None);
    }

    #[test]
    fn error_frame_is_incoming_error() {
        let frame = parse_frame(r#"{"type":"error","error":{"code":2,"msg":"message text is missing"}}"#);
        assert_eq!(
            frame,
            Frame::Event(InboundEvent::IncomingError(
                "code 2: message text is missing".into()
            ))
        );
    }

    #[test]
    fn acks_pongs_and_unknown_types_are_ignored() {
        assert_eq!(parse_frame(r#"{"type":"pong","reply_to":1}"#), Frame::Ignored);
        assert_eq!(parse_frame(r#"{"ok":true,"reply_to":1,"ts":"1.0"}"#), Frame::Ignored);
        assert_eq!(parse_frame(r#"{"type":"user_typing","channel":"C1"}"#), Frame::Ignored);
    }

    #[test]
    fn malformed_json_is_unmarshalling_error() {
        assert!(matches!(
            parse_frame("{not json"),
            Frame::Event(InboundEvent::UnmarshallingError(_))
        ));
    }

    #[test]
    fn frames_with_object_payloads_are_ignored() {
        for raw in [
            r#"{"type":"user_change","user":{"id":"U1","name":"ann"}}"#,
            r#"{"type":"team_join","user":{"id":"U2"}}"#,
            r#"{"type":"channel_created","channel":{"id":"C9","name":"new"}}"#,
            r#"{"type":"channel_joined","channel":{"id":"C9","members":["U1"]}}"#,
            r#"{"type":"im_created","user":"U1","channel":{"id":"D1"}}"#,
        ] {
            assert_eq!(parse_frame(raw), Frame::Ignored, "{raw}");
        }
    }

    #[test]
    fn null_text_is_an_empty_message() {
        let frame = parse_frame(r#"{"type":"message","user":"U1","channel":"D1","text":null}"#);
        let Frame::Event(InboundEvent::Message(msg)) = frame else {
            panic!("expected a message frame");
        };
        assert_eq!(msg.text, "");
        assert_eq!(msg.channel, ConversationId("D1".into()));
    }

    #[test]
    fn malformed_message_fields_are_unmarshalling_errors() {
        assert!(matches!(
            parse_frame(r#"{"type":"message","channel":{"id":"C1"}}"#),
            Frame::Event(InboundEvent::UnmarshallingError(_))
        ));
    }
}
