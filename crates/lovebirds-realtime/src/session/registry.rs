//! Process-wide mapping from authenticated users to their live channels.
//!
//! A channel maps to exactly one user; a user may hold many channels
//! (multi-device). Entries are removed synchronously when a channel
//! closes, so no background sweep is needed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use lovebirds_core::types::{ChannelId, UserId};

use crate::connection::handle::ConnectionHandle;

/// One authenticated channel of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Owner.
    pub user_id: UserId,
    /// Channel.
    pub channel_id: ChannelId,
    /// Admission time.
    pub connected_at: DateTime<Utc>,
}

impl From<&ConnectionHandle> for Session {
    fn from(handle: &ConnectionHandle) -> Self {
        Self {
            user_id: handle.user_id,
            channel_id: handle.id,
            connected_at: handle.connected_at,
        }
    }
}

/// Result of registering a channel.
#[derive(Debug)]
pub struct Registration {
    /// Whether this is the user's only live channel.
    pub first_for_user: bool,
    /// Oldest channel dropped to respect the per-user limit.
    pub evicted: Option<Arc<ConnectionHandle>>,
}

/// Result of unregistering a channel.
#[derive(Debug)]
pub struct Unregistration {
    /// The removed channel.
    pub handle: Arc<ConnectionHandle>,
    /// Whether the user has no live channels left.
    pub last_for_user: bool,
}

/// Thread-safe registry of all live channels.
///
/// `by_user` is the serialization point for a user's channel list; each
/// mutation of a user's channels happens under that entry's shard lock.
#[derive(Debug)]
pub struct SessionRegistry {
    /// User ID → that user's channels, oldest first.
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Channel ID → channel handle for direct lookup.
    by_channel: DashMap<ChannelId, Arc<ConnectionHandle>>,
    /// Maximum channels per user (0 = unlimited).
    max_per_user: usize,
}

impl SessionRegistry {
    /// Creates a new empty registry.
    pub fn new(max_per_user: usize) -> Self {
        Self {
            by_user: DashMap::new(),
            by_channel: DashMap::new(),
            max_per_user,
        }
    }

    /// Registers a channel for its user.
    ///
    /// When the user is already at the per-user limit the oldest channel is
    /// removed from the registry and returned for the caller to close.
    pub fn register(&self, handle: Arc<ConnectionHandle>) -> Registration {
        let mut channels = self.by_user.entry(handle.user_id).or_default();

        let evicted = if self.max_per_user > 0 && channels.len() >= self.max_per_user {
            let oldest = channels.remove(0);
            self.by_channel.remove(&oldest.id);
            Some(oldest)
        } else {
            None
        };

        self.by_channel.insert(handle.id, handle.clone());
        channels.push(handle);

        Registration {
            first_for_user: channels.len() == 1 && evicted.is_none(),
            evicted,
        }
    }

    /// Removes a channel. Returns `None` if it was not registered.
    pub fn unregister(&self, channel_id: &ChannelId) -> Option<Unregistration> {
        let (_, handle) = self.by_channel.remove(channel_id)?;

        let mut last_for_user = false;
        if let Some(mut channels) = self.by_user.get_mut(&handle.user_id) {
            channels.retain(|c| c.id != *channel_id);
            last_for_user = channels.is_empty();
        }
        if last_for_user {
            self.by_user
                .remove_if(&handle.user_id, |_, channels| channels.is_empty());
        }

        Some(Unregistration {
            handle,
            last_for_user,
        })
    }

    /// IDs of every live channel of a user.
    pub fn channels_for(&self, user_id: &UserId) -> Vec<ChannelId> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.iter().map(|h| h.id).collect())
            .unwrap_or_default()
    }

    /// Handles of every live channel of a user.
    pub fn handles_for(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Gets a channel by ID.
    pub fn get(&self, channel_id: &ChannelId) -> Option<Arc<ConnectionHandle>> {
        self.by_channel.get(channel_id).map(|entry| entry.value().clone())
    }

    /// The session record for a channel.
    pub fn session(&self, channel_id: &ChannelId) -> Option<Session> {
        self.by_channel
            .get(channel_id)
            .map(|entry| Session::from(entry.value().as_ref()))
    }

    /// Whether the user has at least one live channel.
    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.by_user.contains_key(user_id)
    }

    /// Total number of live channels.
    pub fn channel_count(&self) -> usize {
        self.by_channel.len()
    }

    /// Number of users with at least one live channel.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// All live channel handles.
    pub fn all(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_channel
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
