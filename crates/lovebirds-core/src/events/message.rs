//! Message-related domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::chat::{StoredMessage, preview};
use crate::types::id::{ConversationId, MessageId, UserId};

/// Fan-out unit emitted whenever a new message is stored.
///
/// Consumed by every connected Session of every recipient; never stored.
/// Carries enough data for a client to patch its sidebar in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarEvent {
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
    /// The new message.
    pub message_id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Author display name.
    pub sender_name: String,
    /// Truncated body.
    pub preview: String,
    /// Storage timestamp.
    pub sent_at: DateTime<Utc>,
    /// Users the message was addressed to.
    pub recipient_ids: Vec<UserId>,
}

impl SidebarEvent {
    /// Builds the event for a freshly stored message.
    pub fn from_stored(message: &StoredMessage, preview_length: usize) -> Self {
        Self {
            conversation_id: message.conversation_id,
            message_id: message.id,
            sender_id: message.sender_id,
            sender_name: message.sender_name.clone(),
            preview: preview(&message.body, preview_length),
            sent_at: message.sent_at,
            recipient_ids: message.recipient_ids.clone(),
        }
    }
}
