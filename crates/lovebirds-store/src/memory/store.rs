//! In-memory message log using a single `RwLock`-guarded state.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use lovebirds_core::error::AppError;
use lovebirds_core::result::AppResult;
use lovebirds_core::traits::{MessageLog, UserDirectory};
use lovebirds_core::types::chat::preview;
use lovebirds_core::types::{
    ConversationId, ConversationSummary, MessageId, NewMessage, Participant, StoredMessage, UserId,
};

use crate::seed::Seed;

/// Characters of the last message kept in sidebar summaries unless
/// overridden with [`MemoryMessageLog::with_preview_length`].
const DEFAULT_PREVIEW_LENGTH: usize = 80;

#[derive(Debug, Default)]
struct StoreState {
    /// User ID → (display name, incognito).
    users: HashMap<UserId, (String, bool)>,
    /// Conversation ID → participants.
    conversations: HashMap<ConversationId, Vec<UserId>>,
    /// Conversation ID → messages in storage order.
    messages: HashMap<ConversationId, Vec<StoredMessage>>,
    /// (conversation, reader) → last read time.
    read_marks: HashMap<(ConversationId, UserId), DateTime<Utc>>,
    /// (blocker, blocked).
    blocks: HashSet<(UserId, UserId)>,
}

impl StoreState {
    fn display_name(&self, user_id: &UserId) -> String {
        self.users
            .get(user_id)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn summary_for(
        &self,
        conversation_id: ConversationId,
        participants: &[UserId],
        viewer: UserId,
        preview_length: usize,
    ) -> Option<ConversationSummary> {
        let messages = self.messages.get(&conversation_id)?;
        let last = messages.last()?;
        let other = participants.iter().copied().find(|p| *p != viewer)?;
        let read_at = self.read_marks.get(&(conversation_id, viewer));

        let unread_count = messages
            .iter()
            .filter(|m| m.sender_id != viewer)
            .filter(|m| read_at.is_none_or(|at| m.sent_at > *at))
            .count() as u32;

        Some(ConversationSummary {
            conversation_id,
            other_participant: Participant {
                id: other,
                name: self.display_name(&other),
            },
            last_message_preview: preview(&last.body, preview_length),
            last_message_at: last.sent_at,
            unread_count,
        })
    }
}

/// Message log and user directory held entirely in process memory.
#[derive(Debug)]
pub struct MemoryMessageLog {
    state: RwLock<StoreState>,
    preview_length: usize,
}

impl Default for MemoryMessageLog {
    fn default() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            preview_length: DEFAULT_PREVIEW_LENGTH,
        }
    }
}

impl MemoryMessageLog {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many characters of the last message summaries carry.
    ///
    /// Should match the preview length used for sidebar events so
    /// snapshots and deltas agree.
    pub fn with_preview_length(mut self, preview_length: usize) -> Self {
        self.preview_length = preview_length;
        self
    }

    /// Creates a store preloaded from seed data.
    pub async fn from_seed(seed: Seed) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write().await;
            for user in &seed.users {
                state
                    .users
                    .insert(user.id, (user.name.clone(), user.incognito));
            }
            for conversation in &seed.conversations {
                state
                    .conversations
                    .insert(conversation.id, conversation.participants.clone());
            }
            state.blocks.extend(seed.blocks.iter().copied());

            info!(
                users = seed.users.len(),
                conversations = seed.conversations.len(),
                "Message store seeded"
            );
        }
        store
    }

    /// Registers or renames a user.
    pub async fn add_user(&self, user_id: UserId, name: &str) {
        let mut state = self.state.write().await;
        let incognito = state.users.get(&user_id).is_some_and(|(_, i)| *i);
        state.users.insert(user_id, (name.to_string(), incognito));
    }

    /// Toggles incognito mode for a user.
    pub async fn set_incognito(&self, user_id: UserId, incognito: bool) {
        let mut state = self.state.write().await;
        let entry = state
            .users
            .entry(user_id)
            .or_insert_with(|| ("Unknown".to_string(), false));
        entry.1 = incognito;
    }

    /// Records that `blocker` blocked `blocked`.
    pub async fn block(&self, blocker: UserId, blocked: UserId) {
        self.state.write().await.blocks.insert((blocker, blocked));
    }

    /// Creates a conversation between the given users.
    pub async fn create_conversation(&self, participants: Vec<UserId>) -> ConversationId {
        let id = ConversationId::new();
        self.state
            .write()
            .await
            .conversations
            .insert(id, participants);
        id
    }

    /// Appends a message with an explicit timestamp, bypassing validation.
    pub async fn insert_message_at(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        body: &str,
        sent_at: DateTime<Utc>,
    ) -> AppResult<StoredMessage> {
        let mut state = self.state.write().await;
        let participants = state
            .conversations
            .get(&conversation_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Conversation {conversation_id} not found")))?;

        let message = StoredMessage {
            id: MessageId::new(),
            conversation_id,
            sender_id,
            sender_name: state.display_name(&sender_id),
            body: body.to_string(),
            sent_at,
            recipient_ids: participants
                .iter()
                .copied()
                .filter(|p| *p != sender_id)
                .collect(),
        };

        let log = state.messages.entry(conversation_id).or_default();
        log.push(message.clone());
        log.sort_by_key(|m| m.sent_at);
        Ok(message)
    }
}

#[async_trait]
impl MessageLog for MemoryMessageLog {
    async fn recent_summaries_for(&self, user_id: UserId) -> AppResult<Vec<ConversationSummary>> {
        let state = self.state.read().await;
        let summaries = state
            .conversations
            .iter()
            .filter(|(_, participants)| participants.contains(&user_id))
            .filter_map(|(id, participants)| state.summary_for(*id, participants, user_id, self.preview_length))
            .collect();
        Ok(summaries)
    }

    async fn store(&self, message: NewMessage) -> AppResult<StoredMessage> {
        let mut state = self.state.write().await;
        let participants = state
            .conversations
            .get(&message.conversation_id)
            .cloned()
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Conversation {} not found",
                    message.conversation_id
                ))
            })?;

        if !participants.contains(&message.sender_id) {
            return Err(AppError::authorization(
                "Sender is not a participant of this conversation",
            ));
        }

        let log = state.messages.entry(message.conversation_id).or_default();
        // Keep storage order and timestamp order aligned.
        let now = Utc::now();
        let sent_at = log.last().map_or(now, |last| last.sent_at.max(now));

        let stored = StoredMessage {
            id: MessageId::new(),
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            body: message.body,
            sent_at,
            recipient_ids: participants
                .iter()
                .copied()
                .filter(|p| *p != message.sender_id)
                .collect(),
        };
        log.push(stored.clone());
        state
            .read_marks
            .insert((stored.conversation_id, stored.sender_id), sent_at);

        debug!(
            message_id = %stored.id,
            conversation_id = %stored.conversation_id,
            "Message stored"
        );
        Ok(stored)
    }

    async fn participants(&self, conversation_id: ConversationId) -> AppResult<Vec<UserId>> {
        self.state
            .read()
            .await
            .conversations
            .get(&conversation_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Conversation {conversation_id} not found")))
    }

    async fn partners_of(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        let state = self.state.read().await;
        let partners: HashSet<UserId> = state
            .conversations
            .values()
            .filter(|participants| participants.contains(&user_id))
            .flat_map(|participants| participants.iter().copied())
            .filter(|p| *p != user_id)
            .collect();
        Ok(partners.into_iter().collect())
    }

    async fn mark_read(&self, conversation_id: ConversationId, user_id: UserId) -> AppResult<()> {
        let mut state = self.state.write().await;
        let participants = state
            .conversations
            .get(&conversation_id)
            .ok_or_else(|| AppError::not_found(format!("Conversation {conversation_id} not found")))?;
        if !participants.contains(&user_id) {
            return Err(AppError::authorization(
                "Reader is not a participant of this conversation",
            ));
        }

        let latest = state
            .messages
            .get(&conversation_id)
            .and_then(|m| m.last())
            .map_or_else(Utc::now, |m| m.sent_at.max(Utc::now()));
        state.read_marks.insert((conversation_id, user_id), latest);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryMessageLog {
    async fn is_blocked_between(&self, a: UserId, b: UserId) -> AppResult<bool> {
        let state = self.state.read().await;
        Ok(state.blocks.contains(&(a, b)) || state.blocks.contains(&(b, a)))
    }

    async fn is_incognito(&self, user_id: UserId) -> AppResult<bool> {
        let state = self.state.read().await;
        Ok(state.users.get(&user_id).is_some_and(|(_, i)| *i))
    }
}
