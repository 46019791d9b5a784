//! Seed data format for preloading users and conversations.

use std::path::Path;

use serde::{Deserialize, Serialize};

use lovebirds_core::error::AppError;
use lovebirds_core::types::{ConversationId, UserId};

/// Users, conversations and blocks to preload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    /// Known users.
    #[serde(default)]
    pub users: Vec<SeedUser>,
    /// Conversations and their participants.
    #[serde(default)]
    pub conversations: Vec<SeedConversation>,
    /// Blocked pairs `[blocker, blocked]`.
    #[serde(default)]
    pub blocks: Vec<(UserId, UserId)>,
}

/// A seeded user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Hide presence and typing activity.
    #[serde(default)]
    pub incognito: bool,
}

/// A seeded conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConversation {
    /// Conversation ID.
    pub id: ConversationId,
    /// Participant user IDs.
    pub participants: Vec<UserId>,
}

impl Seed {
    /// Reads a seed from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AppError::configuration(format!(
                "Failed to read seed file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}
