//! Message log seam (external durable store).

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::chat::{ConversationSummary, NewMessage, StoredMessage};
use crate::types::id::{ConversationId, UserId};

/// Durable message storage as seen by the real-time core.
#[async_trait]
pub trait MessageLog: Send + Sync + std::fmt::Debug + 'static {
    /// One summary per conversation involving `user_id`, built from the
    /// most recent message of each. Order is unspecified.
    async fn recent_summaries_for(&self, user_id: UserId) -> AppResult<Vec<ConversationSummary>>;

    /// Stores a message and returns it with its recipients.
    ///
    /// Fails with `NotFound` for unknown conversations and `Authorization`
    /// when the sender is not a participant.
    async fn store(&self, message: NewMessage) -> AppResult<StoredMessage>;

    /// All participants of a conversation.
    async fn participants(&self, conversation_id: ConversationId) -> AppResult<Vec<UserId>>;

    /// Every user sharing at least one conversation with `user_id`.
    async fn partners_of(&self, user_id: UserId) -> AppResult<Vec<UserId>>;

    /// Marks all messages of a conversation as read by `user_id`.
    async fn mark_read(&self, conversation_id: ConversationId, user_id: UserId) -> AppResult<()>;
}
