//! The inter-node `node.request`/`node.reply` wrapper over [`PicoClient`]
//! (spec §4.7).

use uuid::Uuid;

use super::client::PicoClient;
use super::envelope::{Envelope, MessageType};
use super::payload::NodePayload;
use super::PicoError;

/// Send `payload` as a `node.request` to `addr`, validate the reply's type
/// and `request_id`, and return its payload.
///
/// A fresh `request_id` is assigned to the outgoing payload regardless of
/// whatever value it already carried. A reply whose type isn't `node.reply`
/// or whose payload `request_id` doesn't match is a fatal [`PicoError`] for
/// this exchange (spec §4.7, §8 invariant 9).
pub async fn node_request(
    client: &PicoClient,
    addr: &str,
    session_id: &str,
    mut payload: NodePayload,
) -> Result<NodePayload, PicoError> {
    let request_id = Uuid::new_v4().to_string();
    payload.set_request_id(&request_id);

    let request = Envelope {
        kind: MessageType::NodeRequest,
        id: Some(request_id.clone()),
        session_id: Some(session_id.to_owned()),
        timestamp: None,
        payload: Some(payload.into_map()),
    };

    let reply = client.send_request(addr, session_id, &request).await?;
    if reply.kind != MessageType::NodeReply {
        return Err(PicoError::Protocol(format!("expected node.reply, got {:?}", reply.kind)));
    }

    let reply_payload = NodePayload::new(reply.payload.unwrap_or_default());
    if reply_payload.request_id() != Some(request_id.as_str()) {
        return Err(PicoError::Protocol("reply request_id does not match the request".to_owned()));
    }

    Ok(reply_payload)
}

/// Like [`node_request`], but surfaces a payload-level `error` field as a
/// `"node error: <msg>"` [`PicoError::Remote`] instead of returning it
/// (spec §4.7 "`SendMessage`").
pub async fn send_message(
    client: &PicoClient,
    addr: &str,
    session_id: &str,
    payload: NodePayload,
) -> Result<String, PicoError> {
    let reply = node_request(client, addr, session_id, payload).await?;
    if let Some(err) = reply.error() {
        return Err(PicoError::Remote(format!("node error: {err}")));
    }
    Ok(reply.response().unwrap_or_default().to_owned())
}
