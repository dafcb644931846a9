//! WhatsApp adapter shell: HTTP bridge client for a Baileys-based sidecar
//! (spec §4.8), grounded in the same request/response shape the project's
//! other HTTP bridge clients use. The sidecar's own session/QR pairing
//! flow is out of scope here.

use async_trait::async_trait;
use serde::Deserialize;

use super::ChannelAdapter;

/// Default port the WhatsApp bridge listens on.
pub const DEFAULT_BRIDGE_PORT: u16 = 3001;

/// WhatsApp bridge errors.
#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    /// The bridge responded with `success: false`.
    #[error("WhatsApp bridge error: {0}")]
    Bridge(String),
    /// The HTTP request itself failed.
    #[error("WhatsApp bridge HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct BridgeResponse {
    success: bool,
    error: Option<String>,
}

/// A minimal WhatsApp channel adapter: owns the bridge's base URL and an
/// HTTP client, and can deliver replies via the bridge's send endpoint.
pub struct WhatsAppAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl WhatsAppAdapter {
    /// Construct an adapter pointing at the bridge's `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl ChannelAdapter for WhatsAppAdapter {
    fn channel_name(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, chat_id: &str, text: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(format!("{}/send", self.base_url))
            .json(&serde_json::json!({ "jid": chat_id, "text": text }))
            .send()
            .await
            .map_err(WhatsAppError::from)?;
        let body: BridgeResponse = response.json().await.map_err(WhatsAppError::from)?;
        if !body.success {
            return Err(WhatsAppError::Bridge(body.error.unwrap_or_default()).into());
        }
        Ok(())
    }
}
