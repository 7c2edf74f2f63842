//! Channel wire protocol: message envelope, frame builders, and join reply
//! classification. Frames are JSON text.

use serde::{Deserialize, Serialize};

use crate::Error;

// ---------------------------------------------------------------------------
// Protocol constants
// ---------------------------------------------------------------------------

pub mod event {
    pub const JOIN: &str = "phx_join";
    pub const REPLY: &str = "phx_reply";
    pub const SUBSCRIBE: &str = "subscribe";
    pub const HEARTBEAT: &str = "heartbeat";
}

/// Topic reserved for connection-level traffic (heartbeats and their replies).
pub const SYSTEM_TOPIC: &str = "phoenix";
const TOPIC_PREFIX: &str = "api:";
const STATUS_OK: &str = "ok";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One channel frame: `{"topic", "event", "payload", "ref"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
}

/// The server's answer to a channel join.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinAck {
    /// `phx_reply` with `status: "ok"`.
    Ok { response: serde_json::Value },
    /// `phx_reply` with any other status.
    Rejected { reason: String },
    /// A frame that is not a join reply for our topic.
    Unrecognized { raw: String },
}

impl JoinAck {
    pub fn is_ok(&self) -> bool {
        matches!(self, JoinAck::Ok { .. })
    }
}

// ---------------------------------------------------------------------------
// Encode / decode helpers
// ---------------------------------------------------------------------------

pub fn encode_msg(msg: &ChannelMessage) -> Result<String, Error> {
    serde_json::to_string(msg).map_err(|e| Error::Protocol(format!("encode error: {e}")))
}

pub fn decode_msg(text: &str) -> Result<ChannelMessage, Error> {
    serde_json::from_str(text).map_err(|e| Error::Protocol(format!("decode error: {e}")))
}

/// Channel topic for an API key. Join and subscribe must use the same value.
pub fn channel_topic(api_key: &str) -> String {
    format!("{TOPIC_PREFIX}{api_key}")
}

// ---------------------------------------------------------------------------
// Frame builders
// ---------------------------------------------------------------------------

pub fn build_join_msg(topic: &str, access_token: &str) -> ChannelMessage {
    ChannelMessage {
        topic: topic.to_string(),
        event: event::JOIN.to_string(),
        payload: serde_json::json!({ "access_token": access_token }),
        msg_ref: Some(String::new()),
    }
}

pub fn build_subscribe_msg(topic: &str, topic_ids: &[String]) -> ChannelMessage {
    ChannelMessage {
        topic: topic.to_string(),
        event: event::SUBSCRIBE.to_string(),
        payload: serde_json::json!({ "list": topic_ids }),
        msg_ref: Some(String::new()),
    }
}

pub fn build_heartbeat_msg(seq: u64) -> ChannelMessage {
    ChannelMessage {
        topic: SYSTEM_TOPIC.to_string(),
        event: event::HEARTBEAT.to_string(),
        payload: serde_json::json!({}),
        msg_ref: Some(seq.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Inbound classification
// ---------------------------------------------------------------------------

/// Classify the first frame received after a join.
pub fn classify_join_reply(raw: &str, topic: &str) -> JoinAck {
    let unrecognized = || JoinAck::Unrecognized {
        raw: raw.to_string(),
    };
    let Ok(msg) = decode_msg(raw) else {
        return unrecognized();
    };
    if msg.event != event::REPLY || msg.topic != topic {
        return unrecognized();
    }
    let Some(status) = msg.payload.get("status").and_then(|s| s.as_str()) else {
        return unrecognized();
    };
    let response = msg
        .payload
        .get("response")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    if status == STATUS_OK {
        return JoinAck::Ok { response };
    }
    let reason = response
        .get("reason")
        .and_then(|r| r.as_str())
        .map_or_else(|| format!("join status {status}"), str::to_string);
    JoinAck::Rejected { reason }
}

/// Whether a streamed frame is connection-level traffic rather than an update.
pub fn is_system_frame(raw: &str) -> bool {
    decode_msg(raw).is_ok_and(|m| m.topic == SYSTEM_TOPIC && m.event == event::REPLY)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
