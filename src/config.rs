//! Configuration loading: `picoclaw.toml` (or `$PICOCLAW_CONFIG_PATH`)
//! overlaid onto defaults (spec §6 "Configuration surface consumed by the
//! core").

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable overriding the default config file location.
pub const CONFIG_PATH_ENV: &str = "PICOCLAW_CONFIG_PATH";

/// Default config file name, resolved relative to the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "picoclaw.toml";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's contents are not valid TOML for this schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The path that failed to parse.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// Top-level configuration (spec §6). Every section has sensible defaults
/// so a missing config file still yields a usable configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Session manager configuration.
    pub session: SessionConfig,
    /// Agent (LLM) configuration.
    pub agents: AgentsConfig,
    /// Per-channel configuration, keyed by channel name.
    pub channels: HashMap<String, ChannelConfig>,
}

/// Session manager configuration (spec §6 `session.backlog_limit`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory session files are persisted under. Empty disables
    /// persistence (spec §4.5).
    pub storage_dir: String,
    /// Number of sessions kept per scope after `/new` (spec §6).
    pub backlog_limit: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { storage_dir: String::new(), backlog_limit: 20 }
    }
}

/// Agent/LLM configuration (spec §6 `agents.defaults.*`).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AgentsConfig {
    /// Default provider/model, shown by `/show` and `/list`.
    pub defaults: AgentDefaults,
}

/// Default provider/model pair (spec §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    /// Default LLM provider name, e.g. `"anthropic"`.
    pub provider: String,
    /// Default model name, e.g. `"claude-opus-4"`.
    pub model: String,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self { provider: "anthropic".to_owned(), model: "claude-opus-4".to_owned() }
    }
}

/// Per-channel configuration (spec §6 `channels.<name>.enabled`).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ChannelConfig {
    /// Whether this channel is active.
    pub enabled: bool,
}

impl Config {
    /// Resolve the config file path: `$PICOCLAW_CONFIG_PATH` if set,
    /// otherwise [`DEFAULT_CONFIG_FILE`] in the current directory.
    pub fn resolve_path() -> PathBuf {
        env::var_os(CONFIG_PATH_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
    }

    /// Load configuration from `path`. A missing file yields
    /// [`Config::default`] rather than an error.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Read { path: path.to_path_buf(), source: e }),
        };
        let text = String::from_utf8_lossy(&bytes);
        toml::from_str(&text)
            .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), source: Box::new(e) })
    }

    /// The command-runtime's read-only configuration view (spec §4.4).
    pub fn runtime_view(&self) -> crate::command::RuntimeConfig {
        let mut enabled_channels: Vec<(String, bool)> =
            self.channels.iter().map(|(name, c)| (name.clone(), c.enabled)).collect();
        enabled_channels.sort_by(|a, b| a.0.cmp(&b.0));
        crate::command::RuntimeConfig {
            default_provider: self.agents.defaults.provider.clone(),
            default_model: self.agents.defaults.model.clone(),
            backlog_limit: self.session.backlog_limit,
            enabled_channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(config.agents.defaults.provider, "anthropic");
        assert_eq!(config.session.backlog_limit, 20);
    }

    #[tokio::test]
    async fn loads_and_overlays_partial_sections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("picoclaw.toml");
        tokio::fs::write(
            &path,
            r#"
            [session]
            backlog_limit = 5

            [channels.telegram]
            enabled = true
            "#,
        )
        .await
        .unwrap();

        let config = Config::load(&path).await.unwrap();
        assert_eq!(config.session.backlog_limit, 5);
        assert_eq!(config.agents.defaults.provider, "anthropic");
        assert!(config.channels.get("telegram").unwrap().enabled);
    }

    #[test]
    fn runtime_view_sorts_channels_by_name() {
        let mut config = Config::default();
        config.channels.insert("whatsapp".to_owned(), ChannelConfig { enabled: true });
        config.channels.insert("telegram".to_owned(), ChannelConfig { enabled: false });
        let view = config.runtime_view();
        assert_eq!(view.enabled_channels, vec![("telegram".to_owned(), false), ("whatsapp".to_owned(), true)]);
    }
}
