//! The stateless-per-request Pico WebSocket client (spec §4.7).

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;

use super::envelope::Envelope;
use super::PicoError;

/// Default read deadline for a Pico exchange (spec §4.7, §5).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A Pico WebSocket client. Holds no connection state between calls: every
/// [`Self::send_request`] dials fresh, exchanges one frame each way, and
/// closes (spec §4.7 "stateless per request").
#[derive(Debug, Clone, Default)]
pub struct PicoClient {
    /// Bearer token attached to the handshake request, if configured.
    pub auth_token: Option<String>,
    /// Read deadline for the reply frame.
    pub timeout: Duration,
}

impl PicoClient {
    /// Construct a client with the default 30s timeout and no auth token.
    pub fn new() -> Self {
        Self { auth_token: None, timeout: DEFAULT_TIMEOUT }
    }

    /// Dial `addr`, send `message` as a single JSON frame over
    /// `ws://<addr>/pico/ws?session_id=<session_id>`, read one reply frame,
    /// and close (spec §4.7, §6 "Pico WebSocket wire format").
    pub async fn send_request(
        &self,
        addr: &str,
        session_id: &str,
        message: &Envelope,
    ) -> Result<Envelope, PicoError> {
        let url = format!("ws://{addr}/pico/ws?session_id={session_id}");
        let mut request = url.into_client_request().map_err(PicoError::Transport)?;
        if let Some(token) = &self.auth_token {
            let value = format!("Bearer {token}")
                .parse()
                .map_err(|_| PicoError::Protocol("invalid auth token".to_owned()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (mut stream, _response) =
            tokio_tungstenite::connect_async(request).await.map_err(PicoError::Transport)?;

        let frame = serde_json::to_string(message).map_err(|e| PicoError::Protocol(e.to_string()))?;
        stream.send(Message::Text(frame)).await.map_err(PicoError::Transport)?;

        let reply = tokio::time::timeout(self.timeout, stream.next())
            .await
            .map_err(|_| PicoError::Timeout)?
            .ok_or_else(|| PicoError::Protocol("connection closed before a reply arrived".to_owned()))?
            .map_err(PicoError::Transport)?;

        let _ = stream.close(None).await;

        let text = match reply {
            Message::Text(text) => text,
            Message::Binary(bytes) => {
                String::from_utf8(bytes).map_err(|e| PicoError::Protocol(e.to_string()))?
            }
            other => return Err(PicoError::Protocol(format!("unexpected frame: {other:?}"))),
        };
        serde_json::from_str(&text).map_err(|e| PicoError::Protocol(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_client_uses_the_spec_timeout() {
        let client = PicoClient::new();
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert!(client.auth_token.is_none());
    }
}
