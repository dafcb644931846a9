//! Persistent session manager (spec §4.5).
//!
//! Sessions are grouped by an opaque *scope* key into a [`ScopeEntry`]
//! holding an ordered, most-recent-first list of session keys and the
//! currently active one. The whole scope->entry map plus a deferred-delete
//! queue is the [`SessionIndex`], written to `index.json`; each session's
//! own history lives in its own `<sanitized key>.json` file. Both are
//! written via the same atomic temp-file-then-rename protocol so a reader
//! never observes a partially written file.

mod atomic;
mod manager;
mod model;

pub use atomic::{sanitize_filename, session_path};
pub use manager::{FileDeleter, SessionManager};
pub use model::{
    key_for_ordinal, key_ordinal, ChatMessage, Role, ScopeEntry, Session, SessionIndex,
    SessionSummary, INDEX_VERSION,
};

/// Errors raised by the session manager.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Underlying filesystem operation failed.
    #[error("session storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A session or index file contained invalid JSON, or a value failed
    /// to serialize.
    #[error("session storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A session key is unsuitable for use as a filename.
    #[error("invalid session key: {0:?}")]
    InvalidKey(String),
    /// `resume`'s index argument was out of range.
    #[error("session index {got} out of range (1..={len})")]
    InvalidIndex {
        /// The index the caller supplied.
        got: i64,
        /// Number of sessions in the scope at the time of the call.
        len: usize,
    },
    /// `prune`'s limit argument was below 1.
    #[error("backlog limit must be at least 1, got {0}")]
    LimitTooSmall(i64),
}
