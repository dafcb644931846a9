//! Telegram adapter shell: `sendMessage` plumbing and bot-mention filtering
//! (spec §4.8). Long-polling `getUpdates` and update normalization are the
//! adapter's own network-I/O concern and out of scope here.

use async_trait::async_trait;
use serde::Deserialize;

use super::ChannelAdapter;

/// Telegram Bot API errors.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// The Bot API returned a non-`ok` response.
    #[error("Telegram API error: {0}")]
    Api(String),
    /// The HTTP request itself failed.
    #[error("Telegram HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// A minimal Telegram channel adapter: owns the bot token and an HTTP
/// client, and can deliver replies via `sendMessage`.
pub struct TelegramAdapter {
    bot_token: String,
    /// This bot's own `@username`, used to filter mention-qualified
    /// commands not addressed to it (spec §4.8).
    pub own_username: String,
    client: reqwest::Client,
}

impl TelegramAdapter {
    /// Construct an adapter for `bot_token`, addressable as `own_username`.
    pub fn new(bot_token: impl Into<String>, own_username: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            own_username: own_username.into(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn channel_name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, chat_id: &str, text: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text, "parse_mode": "HTML" }))
            .send()
            .await
            .map_err(TelegramError::from)?;
        let body: ApiResponse = response.json().await.map_err(TelegramError::from)?;
        if !body.ok {
            return Err(TelegramError::Api(body.description.unwrap_or_default()).into());
        }
        Ok(())
    }
}
