//! Request DTOs.

use serde::{Deserialize, Serialize};

use lovebirds_realtime::message::types::InboundMessage;

/// Polling handshake body: the same auth payload the streaming transport
/// sends as its first frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollHandshakeRequest {
    /// Bearer credential.
    pub token: String,
}

/// Events posted on a polling channel: one, or a batch in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PollPayload {
    /// Several events, processed in array order.
    Batch(Vec<InboundMessage>),
    /// A single event.
    Single(InboundMessage),
}

impl PollPayload {
    /// Flattens into processing order.
    pub fn into_events(self) -> Vec<InboundMessage> {
        match self {
            Self::Batch(events) => events,
            Self::Single(event) => vec![event],
        }
    }
}
