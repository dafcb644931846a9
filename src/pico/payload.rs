//! Typed accessors over a Pico envelope's payload map (spec §3 "Node
//! Payload").

use std::collections::HashMap;

use serde_json::Value;

/// A thin typed view over an [`crate::pico::Envelope`]'s payload map.
///
/// Recognized keys: `action`, `request_id`, `source_node_id`, `content`,
/// `channel`, `chat_id`, `sender_id`, `metadata`, `error`, `response`,
/// `request`, `handoff_response`. Unrecognized keys are preserved but have
/// no dedicated accessor.
#[derive(Debug, Clone, Default)]
pub struct NodePayload(HashMap<String, Value>);

/// Recognized `action` values (spec §3).
pub mod actions {
    /// A plain routed message.
    pub const MESSAGE: &str = "message";
    /// A request to hand off a conversation to another node.
    pub const HANDOFF_REQUEST: &str = "handoff_request";
}

impl NodePayload {
    /// Wrap a raw payload map.
    pub fn new(map: HashMap<String, Value>) -> Self {
        Self(map)
    }

    /// Unwrap back into the raw payload map.
    pub fn into_map(self) -> HashMap<String, Value> {
        self.0
    }

    fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    fn set_str(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_owned(), Value::String(value.into()));
    }

    /// The `action` field.
    pub fn action(&self) -> Option<&str> {
        self.str("action")
    }

    /// Set the `action` field.
    pub fn set_action(&mut self, action: impl Into<String>) {
        self.set_str("action", action);
    }

    /// The `request_id` field, used to correlate `node.request`/`node.reply`.
    pub fn request_id(&self) -> Option<&str> {
        self.str("request_id")
    }

    /// Set the `request_id` field.
    pub fn set_request_id(&mut self, id: impl Into<String>) {
        self.set_str("request_id", id);
    }

    /// The `source_node_id` field.
    pub fn source_node_id(&self) -> Option<&str> {
        self.str("source_node_id")
    }

    /// The `content` field.
    pub fn content(&self) -> Option<&str> {
        self.str("content")
    }

    /// The `channel` field.
    pub fn channel(&self) -> Option<&str> {
        self.str("channel")
    }

    /// The `chat_id` field.
    pub fn chat_id(&self) -> Option<&str> {
        self.str("chat_id")
    }

    /// The `sender_id` field.
    pub fn sender_id(&self) -> Option<&str> {
        self.str("sender_id")
    }

    /// The `metadata` field, as a raw JSON value.
    pub fn metadata(&self) -> Option<&Value> {
        self.0.get("metadata")
    }

    /// The `error` field, when this reply carries one (spec §4.7
    /// "`SendMessage` fails with `node error: <msg>`").
    pub fn error(&self) -> Option<&str> {
        self.str("error")
    }

    /// The `response` field: the reply text when no `error` is present.
    pub fn response(&self) -> Option<&str> {
        self.str("response")
    }

    /// The `request` field, as a raw JSON value.
    pub fn request(&self) -> Option<&Value> {
        self.0.get("request")
    }

    /// The `handoff_response` field, as a raw JSON value.
    pub fn handoff_response(&self) -> Option<&Value> {
        self.0.get("handoff_response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_read_back_set_values() {
        let mut payload = NodePayload::default();
        payload.set_action(actions::MESSAGE);
        payload.set_request_id("req-1");
        assert_eq!(payload.action(), Some(actions::MESSAGE));
        assert_eq!(payload.request_id(), Some("req-1"));
        assert_eq!(payload.channel(), None);
    }

    #[test]
    fn error_and_response_are_mutually_legible() {
        let mut map = HashMap::new();
        map.insert("error".to_owned(), Value::String("boom".to_owned()));
        let payload = NodePayload::new(map);
        assert_eq!(payload.error(), Some("boom"));
        assert_eq!(payload.response(), None);
    }
}
