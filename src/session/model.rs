//! On-disk data shapes for sessions and the session index (spec §3).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current on-disk session index schema version.
pub const INDEX_VERSION: u32 = 1;

/// Role of a single chat message, mirroring the LLM chat-completion roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt / instructions.
    System,
    /// A message from the human on the other end of the channel.
    User,
    /// A message produced by the assistant.
    Assistant,
    /// The result of a tool invocation, addressed back to the assistant.
    Tool,
}

/// A single message in a session's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who said this.
    pub role: Role,
    /// Message text (may be empty for tool-call-only assistant turns).
    #[serde(default)]
    pub content: String,
    /// Raw tool-call payload, when the assistant requested tool use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<serde_json::Value>,
    /// The tool-call id this message answers, for `role: tool` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Construct a plain user or assistant message with no tool metadata.
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// A persisted conversation, keyed by its session key (spec §3 "Session").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The session's own key, duplicated into the file body so a renamed
    /// or relocated file can still be identified.
    pub key: String,
    /// Ordered chat history, oldest first.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Optional rolling summary of truncated-away history.
    #[serde(default)]
    pub summary: Option<String>,
    /// When this session was first created.
    pub created: DateTime<Utc>,
    /// When this session was last written to.
    pub updated: DateTime<Utc>,
}

impl Session {
    /// Create a brand new, empty session for `key`, stamped with `now`.
    pub fn new(key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            messages: Vec::new(),
            summary: None,
            created: now,
            updated: now,
        }
    }
}

/// One scope's worth of session bookkeeping (spec §3 "scope entry").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeEntry {
    /// The session key currently considered "active" for this scope.
    pub active: String,
    /// Session keys belonging to this scope, most-recent-first.
    pub ordered: Vec<String>,
    /// When this scope entry was last mutated.
    pub updated: DateTime<Utc>,
}

/// Top-level persisted index: scope -> sessions, plus deferred deletes
/// (spec §3 "Session Index").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionIndex {
    /// Schema version; currently always [`INDEX_VERSION`].
    #[serde(default = "default_version")]
    pub version: u32,
    /// Scope key -> scope bookkeeping.
    #[serde(default)]
    pub scopes: HashMap<String, ScopeEntry>,
    /// Session keys whose backing file failed to delete and must be
    /// retried on the next startup.
    #[serde(default)]
    pub pending_deletes: Vec<String>,
}

fn default_version() -> u32 {
    INDEX_VERSION
}

impl Default for SessionIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            scopes: HashMap::new(),
            pending_deletes: Vec::new(),
        }
    }
}

/// Summary row returned by [`crate::session::SessionManager::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// 1-based position within the scope's ordered list.
    pub ordinal: usize,
    /// The session key.
    pub key: String,
    /// Whether this is the scope's currently active session.
    pub active: bool,
    /// Number of messages in the session, or 0 if not loaded in memory.
    pub message_count: usize,
    /// Last-updated timestamp, if the session is loaded in memory.
    pub updated: Option<DateTime<Utc>>,
}

/// Parse the numeric ordinal suffix of a session key relative to its scope.
///
/// `ordinal(scope, scope) == 1`; `ordinal(scope, "scope#7") == Some(7)`;
/// any other shape (wrong prefix, non-numeric or non-positive suffix)
/// returns `None`.
pub fn key_ordinal(scope: &str, key: &str) -> Option<u64> {
    if key == scope {
        return Some(1);
    }
    let suffix = key.strip_prefix(scope)?.strip_prefix('#')?;
    let n: u64 = suffix.parse().ok()?;
    (n >= 2).then_some(n)
}

/// Build the session key for ordinal `n` within `scope` (spec §3 "Session
/// Key Convention"): `n == 1` yields the bare scope, otherwise `scope#n`.
pub fn key_for_ordinal(scope: &str, n: u64) -> String {
    if n <= 1 {
        scope.to_owned()
    } else {
        format!("{scope}#{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_of_bare_scope_is_one() {
        assert_eq!(key_ordinal("agent:main", "agent:main"), Some(1));
    }

    #[test]
    fn ordinal_of_suffixed_key() {
        assert_eq!(key_ordinal("agent:main", "agent:main#7"), Some(7));
    }

    #[test]
    fn ordinal_rejects_foreign_scope() {
        assert_eq!(key_ordinal("agent:main", "agent:other#2"), None);
    }

    #[test]
    fn ordinal_rejects_non_numeric_suffix() {
        assert_eq!(key_ordinal("agent:main", "agent:main#x"), None);
    }

    #[test]
    fn ordinal_rejects_suffix_below_two() {
        assert_eq!(key_ordinal("agent:main", "agent:main#1"), None);
        assert_eq!(key_ordinal("agent:main", "agent:main#0"), None);
    }

    #[test]
    fn key_for_ordinal_round_trips() {
        assert_eq!(key_for_ordinal("S", 1), "S");
        assert_eq!(key_for_ordinal("S", 2), "S#2");
        assert_eq!(key_ordinal("S", &key_for_ordinal("S", 9)), Some(9));
    }
}
