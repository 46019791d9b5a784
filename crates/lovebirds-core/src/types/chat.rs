//! Chat data carried between the message log and the real-time core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ConversationId, MessageId, UserId};

/// A conversation participant as shown in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
}

/// One sidebar row. Derived from the message log, never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation ID.
    pub conversation_id: ConversationId,
    /// The other side of the conversation.
    pub other_participant: Participant,
    /// Truncated body of the most recent message.
    pub last_message_preview: String,
    /// When the most recent message was stored.
    pub last_message_at: DateTime<Utc>,
    /// Messages from others not yet read by the viewer.
    pub unread_count: u32,
}

/// A message submitted for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    /// Target conversation.
    pub conversation_id: ConversationId,
    /// Author.
    pub sender_id: UserId,
    /// Author display name.
    pub sender_name: String,
    /// Message text.
    pub body: String,
}

/// A message after the log accepted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Assigned message ID.
    pub id: MessageId,
    /// Conversation ID.
    pub conversation_id: ConversationId,
    /// Author.
    pub sender_id: UserId,
    /// Author display name.
    pub sender_name: String,
    /// Message text.
    pub body: String,
    /// Storage timestamp.
    pub sent_at: DateTime<Utc>,
    /// Every participant except the sender.
    pub recipient_ids: Vec<UserId>,
}

/// Truncates `body` to at most `max_chars` characters, appending an
/// ellipsis when anything was cut.
pub fn preview(body: &str, max_chars: usize) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
