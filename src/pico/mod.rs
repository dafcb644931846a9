//! The Pico inter-node protocol: envelope, typed payload, stateless
//! WebSocket client, and the `node.request`/`node.reply` wrapper
//! (spec §2 "Pico Client & Payload" / "Protocol Envelope", §4.7).

mod client;
mod envelope;
mod node;
mod payload;

pub use client::{PicoClient, DEFAULT_TIMEOUT};
pub use envelope::{Envelope, MessageType};
pub use node::{node_request, send_message};
pub use payload::{actions, NodePayload};

/// Errors raised by a Pico exchange (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum PicoError {
    /// The WebSocket dial, read, or write failed.
    #[error("pico transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    /// The reply did not arrive within the read deadline.
    #[error("pico request timed out")]
    Timeout,
    /// The reply was malformed, or didn't match the request (spec §8
    /// invariant 9): wrong type, mismatched `request_id`, or bad JSON.
    #[error("pico protocol error: {0}")]
    Protocol(String),
    /// The remote node reported an error in the reply payload (spec §4.7
    /// "`SendMessage`").
    #[error("{0}")]
    Remote(String),
}
