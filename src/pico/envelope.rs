//! The Pico wire envelope and its message-type tags (spec §3 "Pico Message
//! Envelope").

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single Pico protocol frame (spec §3, §6 "Pico WebSocket wire format").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// The frame's message type.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Request/reply correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Pico session identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Unix-millis timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Free-form payload map, typed accessors in [`crate::pico::NodePayload`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<HashMap<String, serde_json::Value>>,
}

impl Envelope {
    /// Build an envelope of `kind` with no id/session/timestamp/payload set.
    pub fn new(kind: MessageType) -> Self {
        Self { kind, id: None, session_id: None, timestamp: None, payload: None }
    }
}

/// Pico wire message type tags (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Deliver a text message.
    #[serde(rename = "message.send")]
    MessageSend,
    /// Deliver a media attachment.
    #[serde(rename = "media.send")]
    MediaSend,
    /// Liveness probe.
    Ping,
    /// A new message was created on the remote node.
    #[serde(rename = "message.create")]
    MessageCreate,
    /// An existing message was edited on the remote node.
    #[serde(rename = "message.update")]
    MessageUpdate,
    /// A new media item was created on the remote node.
    #[serde(rename = "media.create")]
    MediaCreate,
    /// The remote party started typing.
    #[serde(rename = "typing.start")]
    TypingStart,
    /// The remote party stopped typing.
    #[serde(rename = "typing.stop")]
    TypingStop,
    /// An error occurred processing the prior frame.
    Error,
    /// Liveness probe reply.
    Pong,
    /// An inter-node action request.
    #[serde(rename = "node.request")]
    NodeRequest,
    /// An inter-node action reply.
    #[serde(rename = "node.reply")]
    NodeReply,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_variants_round_trip_through_json() {
        let json = serde_json::to_string(&MessageType::NodeRequest).unwrap();
        assert_eq!(json, "\"node.request\"");
        let parsed: MessageType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, MessageType::NodeRequest);
    }

    #[test]
    fn plain_variants_are_lowercased() {
        assert_eq!(serde_json::to_string(&MessageType::Ping).unwrap(), "\"ping\"");
        assert_eq!(serde_json::to_string(&MessageType::Pong).unwrap(), "\"pong\"");
    }

    #[test]
    fn envelope_omits_absent_optional_fields() {
        let env = Envelope::new(MessageType::Ping);
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, "{\"type\":\"ping\"}");
    }
}
