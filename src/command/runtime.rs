//! The capability bundle handlers receive at invocation time (spec §4.4
//! "Runtime Handlers", §9 "Runtime injection").
//!
//! `Runtime` is passed per-call, not baked into a `Command` at definition
//! time, so the dispatcher never owns a process-wide singleton — multiple
//! agent loops in one process each carry their own.

use std::sync::Arc;

use async_trait::async_trait;

use crate::session::{SessionError, SessionSummary};

/// Session operations a handler may invoke, abstracted so tests can swap in
/// a stub without touching disk.
#[async_trait]
pub trait SessionOps: Send + Sync {
    /// See [`crate::session::SessionManager::start_new`].
    async fn start_new(&self, scope: &str) -> Result<String, SessionError>;
    /// See [`crate::session::SessionManager::list`].
    async fn list(&self, scope: &str) -> Result<Vec<SessionSummary>, SessionError>;
    /// See [`crate::session::SessionManager::resume`].
    async fn resume(&self, scope: &str, idx: i64) -> Result<String, SessionError>;
    /// See [`crate::session::SessionManager::prune`].
    async fn prune(&self, scope: &str, limit: i64) -> Result<Vec<String>, SessionError>;
}

#[async_trait]
impl SessionOps for crate::session::SessionManager {
    async fn start_new(&self, scope: &str) -> Result<String, SessionError> {
        crate::session::SessionManager::start_new(self, scope).await
    }

    async fn list(&self, scope: &str) -> Result<Vec<SessionSummary>, SessionError> {
        crate::session::SessionManager::list(self, scope).await
    }

    async fn resume(&self, scope: &str, idx: i64) -> Result<String, SessionError> {
        crate::session::SessionManager::resume(self, scope, idx).await
    }

    async fn prune(&self, scope: &str, limit: i64) -> Result<Vec<String>, SessionError> {
        crate::session::SessionManager::prune(self, scope, limit).await
    }
}

/// Read-only configuration view `/show` and `/list` render (spec §4.4's
/// "current default model+provider" / "enabled-channels" surfaces).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Default LLM provider name, e.g. `"anthropic"`.
    pub default_provider: String,
    /// Default model name, e.g. `"claude-opus-4"`.
    pub default_model: String,
    /// Backlog limit applied after `/new` (spec §6 `session.backlog_limit`).
    pub backlog_limit: i64,
    /// Channel name -> enabled flag, in configuration order.
    pub enabled_channels: Vec<(String, bool)>,
}

/// The capability bundle a handler is invoked with (spec §4.4, §9).
///
/// A handler that receives `None` instead of a `Runtime`, or one whose
/// `scope` is empty/whitespace, must reply
/// `"Command unavailable in current context."` rather than act.
#[derive(Clone)]
pub struct Runtime {
    /// The channel the invoking request arrived on.
    pub channel: String,
    /// The scope key sessions are grouped under for this conversation.
    pub scope: String,
    /// Session operations handle.
    pub session_ops: Arc<dyn SessionOps>,
    /// Read-only configuration, when one is available.
    pub config: Option<RuntimeConfig>,
}

impl Runtime {
    /// Whether this runtime is usable: non-empty, non-whitespace scope.
    pub fn is_usable(&self) -> bool {
        !self.scope.trim().is_empty()
    }
}

/// The fixed reply for handlers invoked without a usable runtime.
pub const UNAVAILABLE_REPLY: &str = "Command unavailable in current context.";
