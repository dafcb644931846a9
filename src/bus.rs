//! In-memory inbound/outbound message queues connecting channel adapters to
//! the agent loop (spec §4.6 "Message Bus").
//!
//! Each direction is a dedicated single-owner `mpsc` channel: the bus hands
//! out the raw `Sender`/`Receiver` halves rather than cloned senders, so
//! "dedicated single-owner task" (spec §5) holds by construction rather than
//! convention.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A message carried on either bus direction (spec §4.6).
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Channel the message is associated with, e.g. `"telegram"`.
    pub channel: String,
    /// Platform chat/conversation identifier.
    pub chat_id: String,
    /// Platform sender identifier.
    pub sender_id: String,
    /// Message text.
    pub content: String,
    /// Platform message identifier, when available.
    pub message_id: Option<String>,
    /// Free-form metadata attached by the producer.
    pub metadata: Option<serde_json::Value>,
}

/// The two single-writer queues connecting channel adapters to the agent
/// loop (spec §4.6).
pub struct Bus {
    inbound_tx: mpsc::UnboundedSender<BusMessage>,
    inbound_rx: mpsc::UnboundedReceiver<BusMessage>,
    outbound_tx: mpsc::UnboundedSender<BusMessage>,
    outbound_rx: mpsc::UnboundedReceiver<BusMessage>,
}

impl Bus {
    /// Construct a fresh bus with empty queues.
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self { inbound_tx, inbound_rx, outbound_tx, outbound_rx }
    }

    /// Publish `msg` onto the inbound queue (channel adapter → agent).
    ///
    /// Fails only if every receiver has been dropped, which cannot happen
    /// while this `Bus` is alive (the receiver lives alongside the sender).
    pub fn publish_inbound(&self, msg: BusMessage) -> Result<(), BusMessage> {
        self.inbound_tx.send(msg).map_err(|e| e.0)
    }

    /// Publish `msg` onto the outbound queue (agent → channel adapter).
    pub fn publish_outbound(&self, msg: BusMessage) -> Result<(), BusMessage> {
        self.outbound_tx.send(msg).map_err(|e| e.0)
    }

    /// Block until an inbound message arrives or `cancel` fires, whichever
    /// comes first. Returns `None` on cancellation or if the queue closed.
    pub async fn consume_inbound(&mut self, cancel: &CancellationToken) -> Option<BusMessage> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            msg = self.inbound_rx.recv() => msg,
        }
    }

    /// Block until an outbound message arrives or `cancel` fires, whichever
    /// comes first. Returns `None` on cancellation or if the queue closed.
    pub async fn consume_outbound(&mut self, cancel: &CancellationToken) -> Option<BusMessage> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            msg = self.outbound_rx.recv() => msg,
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
