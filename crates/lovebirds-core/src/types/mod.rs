//! Shared types: typed identifiers and chat data.

pub mod chat;
pub mod id;

pub use chat::{ConversationSummary, NewMessage, Participant, StoredMessage};
pub use id::{ChannelId, ConversationId, MessageId, UserId};
