//! Atomic write protocol and filename sanitization (spec §4.5).
//!
//! Every on-disk write — index or session — goes through [`write_atomic`]:
//! serialize, write to a sibling temp file, fsync, rename over the target.
//! A crash between fsync and rename leaves the target untouched; a crash
//! after rename leaves it fully written. There is no partially-written
//! state an external reader can observe.

use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::SessionError;

/// Write `bytes` to `target` atomically, via a same-directory temp file
/// named `{prefix}-<random>.tmp`.
pub async fn write_atomic(target: &Path, prefix: &str, bytes: &[u8]) -> Result<(), SessionError> {
    let dir = target.parent().ok_or_else(|| {
        SessionError::InvalidKey(format!("no parent directory for {}", target.display()))
    })?;
    let tmp_path = dir.join(format!("{prefix}-{}.tmp", uuid::Uuid::new_v4()));

    let result = write_and_rename(&tmp_path, target, bytes).await;
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path).await;
    }
    result
}

async fn write_and_rename(tmp_path: &Path, target: &Path, bytes: &[u8]) -> Result<(), SessionError> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(tmp_path)
        .await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(tmp_path, target).await?;
    Ok(())
}

/// Names that would escape or collide with the storage directory's own
/// reserved files.
const RESERVED_NAMES: [&str; 3] = ["", ".", ".."];

/// Sanitize a session key into a safe file stem: `:` becomes `_`; anything
/// that looks like a path traversal attempt or contains a separator is
/// rejected outright (spec §4.5 "Filename sanitization").
pub fn sanitize_filename(key: &str) -> Result<String, SessionError> {
    if RESERVED_NAMES.contains(&key) {
        return Err(SessionError::InvalidKey(key.to_owned()));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(SessionError::InvalidKey(key.to_owned()));
    }
    let sanitized = key.replace(':', "_");
    if RESERVED_NAMES.contains(&sanitized.as_str()) {
        return Err(SessionError::InvalidKey(key.to_owned()));
    }
    Ok(sanitized)
}

/// Resolve the session file path for `key` under `storage_dir`, rejecting
/// any key that would not stay local to `storage_dir`.
pub fn session_path(storage_dir: &Path, key: &str) -> Result<PathBuf, SessionError> {
    let name = sanitize_filename(key)?;
    let path = storage_dir.join(format!("{name}.json"));
    if path.parent() != Some(storage_dir) {
        return Err(SessionError::InvalidKey(key.to_owned()));
    }
    Ok(path)
}
