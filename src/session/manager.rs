//! The [`SessionManager`] itself: load, self-heal, and the scope/session
//! mutation API (spec §4.5).

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::warn;

use super::atomic::{session_path, write_atomic};
use super::model::{key_for_ordinal, key_ordinal, ScopeEntry, Session, SessionIndex, SessionSummary};
use super::{ChatMessage, Role, SessionError};

const INDEX_FILE_NAME: &str = "index.json";

/// Abstraction over "delete this session file", so tests can simulate a
/// filesystem that fails to delete on the first attempt (spec §8 "Deferred
/// delete").
#[async_trait]
pub trait FileDeleter: Send + Sync {
    /// Remove the file at `path`.
    async fn delete(&self, path: &Path) -> io::Result<()>;
}

struct RealDeleter;

#[async_trait]
impl FileDeleter for RealDeleter {
    async fn delete(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

struct Inner {
    sessions: HashMap<String, Session>,
    index: SessionIndex,
}

/// Persistent, self-healing store of conversation sessions, indexed by
/// scope (spec §4.5).
///
/// Constructed once per agent loop (never a process-wide singleton — spec
/// §9 "Runtime injection"); cheap to clone via [`Arc`] at the call site.
pub struct SessionManager {
    storage_dir: Option<PathBuf>,
    deleter: Arc<dyn FileDeleter>,
    inner: RwLock<Inner>,
}

impl SessionManager {
    /// Open a session manager rooted at `storage_dir`. An empty string
    /// disables persistence entirely: everything lives in memory for the
    /// life of the process.
    pub async fn open(storage_dir: impl Into<String>) -> Result<Self, SessionError> {
        Self::open_with_deleter(storage_dir, Arc::new(RealDeleter)).await
    }

    /// Like [`Self::open`], but with an injectable file-delete backend, for
    /// exercising the deferred-delete retry path in tests.
    pub async fn open_with_deleter(
        storage_dir: impl Into<String>,
        deleter: Arc<dyn FileDeleter>,
    ) -> Result<Self, SessionError> {
        let storage_dir = storage_dir.into();
        if storage_dir.trim().is_empty() {
            return Ok(Self {
                storage_dir: None,
                deleter,
                inner: RwLock::new(Inner {
                    sessions: HashMap::new(),
                    index: SessionIndex::default(),
                }),
            });
        }

        let dir = PathBuf::from(storage_dir);
        tokio::fs::create_dir_all(&dir).await?;

        let sessions = load_sessions(&dir).await?;
        let index = load_index(&dir).await?;

        let manager = Self {
            storage_dir: Some(dir),
            deleter,
            inner: RwLock::new(Inner { sessions, index }),
        };
        manager.self_heal().await?;
        Ok(manager)
    }

    /// The directory sessions are persisted under, or `None` if persistence
    /// is disabled.
    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    async fn persist_index(&self, index: &SessionIndex) -> Result<(), SessionError> {
        let Some(dir) = &self.storage_dir else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(index)?;
        write_atomic(&dir.join(INDEX_FILE_NAME), "index", &bytes).await
    }

    /// Self-heal the freshly loaded index: drop dangling/duplicate/empty
    /// references, fix up a dangling active pointer, and retry any
    /// deferred session-file deletes (spec §4.5 "Loading & self-healing").
    async fn self_heal(&self) -> Result<(), SessionError> {
        let mut changed = false;
        let healed_index = {
            let mut inner = self.inner.write().await;
            let now = Utc::now();

            let loaded_keys: std::collections::HashSet<String> =
                inner.sessions.keys().cloned().collect();

            let mut scopes_to_drop = Vec::new();
            for (scope, entry) in inner.index.scopes.iter_mut() {
                let before = entry.ordered.clone();
                let mut seen = std::collections::HashSet::new();
                entry.ordered.retain(|k| {
                    !k.trim().is_empty() && (k == scope || loaded_keys.contains(k)) && seen.insert(k.clone())
                });
                if entry.ordered != before {
                    changed = true;
                    entry.updated = now;
                }
                if entry.ordered.is_empty() {
                    scopes_to_drop.push(scope.clone());
                    continue;
                }
                if !entry.ordered.contains(&entry.active) {
                    entry.active = entry.ordered[0].clone();
                    changed = true;
                }
            }
            for scope in scopes_to_drop {
                inner.index.scopes.remove(&scope);
                changed = true;
            }

            // Deduplicate pending deletes, dropping empty entries.
            let mut seen = std::collections::HashSet::new();
            let before_len = inner.index.pending_deletes.len();
            inner
                .index
                .pending_deletes
                .retain(|k| !k.trim().is_empty() && seen.insert(k.clone()));
            if inner.index.pending_deletes.len() != before_len {
                changed = true;
            }

            // Deferred deletes must not be visible even though their file
            // delete previously failed.
            for key in &inner.index.pending_deletes {
                inner.sessions.remove(key);
            }

            inner.index.clone()
        };

        let still_pending = self.retry_pending_deletes(healed_index.pending_deletes.clone()).await;
        {
            let mut inner = self.inner.write().await;
            if inner.index.pending_deletes != still_pending {
                changed = true;
            }
            inner.index.pending_deletes = still_pending;
            if changed {
                self.persist_index(&inner.index).await?;
            }
        }
        Ok(())
    }

    /// Attempt to delete each pending session file once more. Returns the
    /// keys that should remain queued for the next startup.
    async fn retry_pending_deletes(&self, pending: Vec<String>) -> Vec<String> {
        let Some(dir) = self.storage_dir.clone() else {
            return pending;
        };
        let mut still_pending = Vec::new();
        for key in pending {
            match session_path(&dir, &key) {
                Err(_) => {
                    // Permanently invalid path: drop it, nothing to retry.
                }
                Ok(path) => match self.deleter.delete(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(key, error = %e, "deferred session delete failed again, keeping queued");
                        still_pending.push(key);
                    }
                },
            }
        }
        still_pending
    }

    /// Ensure `scope` has a well-formed entry, returning a reference to it
    /// plus whether anything was created or repaired (callers persist if
    /// so). Returning the entry directly avoids a separate fallible lookup
    /// at each call site.
    fn ensure_scope<'a>(
        index: &'a mut SessionIndex,
        scope: &str,
        now: DateTime<Utc>,
    ) -> (&'a mut ScopeEntry, bool) {
        let mut created = false;
        let entry = index.scopes.entry(scope.to_owned()).or_insert_with(|| {
            created = true;
            ScopeEntry {
                active: scope.to_owned(),
                ordered: vec![scope.to_owned()],
                updated: now,
            }
        });

        let mut changed = created;
        if entry.ordered.is_empty() {
            entry.ordered.push(scope.to_owned());
            changed = true;
        }
        if entry.active.trim().is_empty() {
            entry.active = entry.ordered[0].clone();
            changed = true;
        }
        (entry, changed)
    }

    /// Resolve the scope's active session key, creating the scope if this
    /// is the first time it's seen.
    pub async fn resolve_active(&self, scope: &str) -> Result<String, SessionError> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let (entry, changed) = Self::ensure_scope(&mut inner.index, scope, now);
        let active = entry.active.clone();
        if changed {
            self.persist_index(&inner.index).await?;
        }
        Ok(active)
    }

    /// Start a new session within `scope`, returning its key
    /// (spec §4.5 "StartNew").
    pub async fn start_new(&self, scope: &str) -> Result<String, SessionError> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;

        let existed_before = inner.index.scopes.contains_key(scope);
        let original_entry = inner.index.scopes.get(scope).cloned();

        let (entry, _) = Self::ensure_scope(&mut inner.index, scope, now);
        let snapshot = entry.clone();

        let next_ordinal = snapshot
            .ordered
            .iter()
            .filter_map(|k| key_ordinal(scope, k))
            .max()
            .map_or(2, |m| m.saturating_add(1));
        let new_key = key_for_ordinal(scope, next_ordinal);

        let new_session = Session::new(&new_key, now);
        inner.sessions.insert(new_key.clone(), new_session.clone());

        let rollback = |inner: &mut Inner| {
            inner.sessions.remove(&new_key);
            if existed_before {
                if let Some(original) = original_entry.clone() {
                    inner.index.scopes.insert(scope.to_owned(), original);
                }
            } else {
                inner.index.scopes.remove(scope);
            }
        };

        if let Some(dir) = &self.storage_dir {
            let path = match session_path(dir, &new_key) {
                Ok(path) => path,
                Err(e) => {
                    rollback(&mut inner);
                    return Err(e);
                }
            };
            let bytes = serde_json::to_vec_pretty(&new_session)?;
            if let Err(e) = write_atomic(&path, "session", &bytes).await {
                rollback(&mut inner);
                return Err(e);
            }
        }

        let mut new_entry = snapshot;
        new_entry.ordered.insert(0, new_key.clone());
        dedupe_preserve_first(&mut new_entry.ordered);
        new_entry.active = new_key.clone();
        new_entry.updated = now;
        inner.index.scopes.insert(scope.to_owned(), new_entry);

        if let Err(e) = self.persist_index(&inner.index).await {
            rollback(&mut inner);
            if let Some(dir) = &self.storage_dir {
                if let Ok(path) = session_path(dir, &new_key) {
                    let _ = tokio::fs::remove_file(&path).await;
                }
            }
            return Err(e);
        }

        Ok(new_key)
    }

    /// List sessions for `scope`, most-recent-first (spec §4.5 "List").
    pub async fn list(&self, scope: &str) -> Result<Vec<SessionSummary>, SessionError> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let (entry, changed) = Self::ensure_scope(&mut inner.index, scope, now);
        let entry = entry.clone();
        if changed {
            self.persist_index(&inner.index).await?;
        }

        Ok(entry
            .ordered
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let session = inner.sessions.get(key);
                SessionSummary {
                    ordinal: i.saturating_add(1),
                    key: key.clone(),
                    active: *key == entry.active,
                    message_count: session.map_or(0, |s| s.messages.len()),
                    updated: session.map(|s| s.updated),
                }
            })
            .collect())
    }

    /// Make the session at 1-based position `idx` within `scope` active
    /// (spec §4.5 "Resume").
    pub async fn resume(&self, scope: &str, idx: i64) -> Result<String, SessionError> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let (entry, _) = Self::ensure_scope(&mut inner.index, scope, now);
        let len = entry.ordered.len();

        if idx < 1 {
            return Err(SessionError::InvalidIndex { got: idx, len });
        }
        let zero_based = idx
            .checked_sub(1)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or(SessionError::InvalidIndex { got: idx, len })?;
        if zero_based >= len {
            return Err(SessionError::InvalidIndex { got: idx, len });
        }

        let key = entry.ordered[zero_based].clone();
        entry.active = key.clone();
        entry.updated = now;
        self.persist_index(&inner.index).await?;
        Ok(key)
    }

    /// Permanently remove a session: evict it from memory, scrub it out of
    /// every scope's ordered list, and delete its file (with deferred
    /// retry on failure) (spec §4.5 "DeleteSession").
    pub async fn delete_session(&self, key: &str) -> Result<(), SessionError> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        inner.sessions.remove(key);

        let mut empty_scopes = Vec::new();
        for (scope, entry) in inner.index.scopes.iter_mut() {
            let before = entry.ordered.len();
            entry.ordered.retain(|k| k != key);
            if entry.ordered.len() != before {
                entry.updated = now;
                if entry.active == key {
                    entry.active = entry.ordered.first().cloned().unwrap_or_default();
                }
            }
            if entry.ordered.is_empty() {
                empty_scopes.push(scope.clone());
            }
        }
        for scope in empty_scopes {
            inner.index.scopes.remove(&scope);
        }

        self.persist_index(&inner.index).await?;

        if let Some(dir) = &self.storage_dir {
            if let Ok(path) = session_path(dir, key) {
                match self.deleter.delete(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(key, error = %e, "failed to delete session file, queuing for retry");
                        if !inner.index.pending_deletes.iter().any(|k| k == key) {
                            inner.index.pending_deletes.push(key.to_owned());
                        }
                        self.persist_index(&inner.index).await?;
                    }
                }
            }
            // An invalid path means there was never a file to delete.
        }

        Ok(())
    }

    /// Delete the oldest sessions in `scope` beyond `limit`, returning the
    /// keys that were enqueued for deletion (spec §4.5 "Prune").
    pub async fn prune(&self, scope: &str, limit: i64) -> Result<Vec<String>, SessionError> {
        if limit < 1 {
            return Err(SessionError::LimitTooSmall(limit));
        }
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let ordered = {
            let now = Utc::now();
            let mut inner = self.inner.write().await;
            let (entry, changed) = Self::ensure_scope(&mut inner.index, scope, now);
            let ordered = entry.ordered.clone();
            if changed {
                self.persist_index(&inner.index).await?;
            }
            ordered
        };

        if ordered.len() <= limit {
            return Ok(Vec::new());
        }

        let mut pruned = Vec::new();
        for key in &ordered[limit..] {
            self.delete_session(key).await?;
            pruned.push(key.clone());
        }
        Ok(pruned)
    }

    /// Conversation history for `key`, or empty if the session is unknown.
    pub async fn get_history(&self, key: &str) -> Vec<ChatMessage> {
        let inner = self.inner.read().await;
        inner.sessions.get(key).map(|s| s.messages.clone()).unwrap_or_default()
    }

    /// Replace `key`'s conversation history wholesale and persist.
    pub async fn set_history(&self, key: &str, messages: Vec<ChatMessage>) -> Result<(), SessionError> {
        let now = Utc::now();
        {
            let mut inner = self.inner.write().await;
            let session = inner
                .sessions
                .entry(key.to_owned())
                .or_insert_with(|| Session::new(key, now));
            session.messages = messages;
            session.updated = now;
        }
        self.save(key).await
    }

    /// Truncate `key`'s history to its last `keep_last` messages, then walk
    /// forward until the new first message has role `user` (spec §4.5
    /// "Truncation policy"). `keep_last <= 0` clears the session.
    pub async fn truncate_history(&self, key: &str, keep_last: i64) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.write().await;
            if let Some(session) = inner.sessions.get_mut(key) {
                if keep_last <= 0 {
                    session.messages.clear();
                } else {
                    let keep = usize::try_from(keep_last).unwrap_or(usize::MAX);
                    let len = session.messages.len();
                    let base = len.saturating_sub(keep);
                    let start = session.messages[base..]
                        .iter()
                        .position(|m| matches!(m.role, Role::User))
                        .map_or(len, |rel| base.saturating_add(rel));
                    session.messages.drain(..start);
                }
                session.updated = Utc::now();
            }
        }
        self.save(key).await
    }

    /// Snapshot `key` under a read lock and write it to disk outside the
    /// lock (spec §5 "Ordering").
    pub async fn save(&self, key: &str) -> Result<(), SessionError> {
        let snapshot = {
            let inner = self.inner.read().await;
            inner.sessions.get(key).cloned()
        };
        let Some(session) = snapshot else {
            return Ok(());
        };
        let Some(dir) = &self.storage_dir else {
            return Ok(());
        };
        let path = session_path(dir, key)?;
        let bytes = serde_json::to_vec_pretty(&session)?;
        write_atomic(&path, "session", &bytes).await
    }
}

fn dedupe_preserve_first(keys: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    keys.retain(|k| seen.insert(k.clone()));
}

async fn load_sessions(dir: &Path) -> Result<HashMap<String, Session>, SessionError> {
    let mut sessions = HashMap::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if path.file_name().and_then(|n| n.to_str()) == Some(INDEX_FILE_NAME) {
            continue;
        }
        let Ok(bytes) = tokio::fs::read(&path).await else {
            continue;
        };
        let Ok(session) = serde_json::from_slice::<Session>(&bytes) else {
            continue;
        };
        if session.key.trim().is_empty() {
            continue;
        }
        sessions.insert(session.key.clone(), session);
    }
    Ok(sessions)
}

async fn load_index(dir: &Path) -> Result<SessionIndex, SessionError> {
    let path = dir.join(INDEX_FILE_NAME);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(error = %e, "index.json is corrupt, starting from an empty index");
            SessionIndex::default()
        })),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SessionIndex::default()),
        Err(e) => Err(e.into()),
    }
}
