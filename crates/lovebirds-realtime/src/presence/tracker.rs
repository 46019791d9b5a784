//! Online presence tracking.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use lovebirds_core::types::UserId;

/// Tracks which users are online and since when.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    /// User ID → online since.
    online: DashMap<UserId, DateTime<Utc>>,
}

impl PresenceTracker {
    /// Create a new presence tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a user as online. Returns `true` if they were offline.
    pub fn set_online(&self, user_id: UserId) -> bool {
        self.online.insert(user_id, Utc::now()).is_none()
    }

    /// Mark a user as offline. Returns `true` if they were online.
    pub fn set_offline(&self, user_id: UserId) -> bool {
        self.online.remove(&user_id).is_some()
    }

    /// Check if a user is online.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.online.contains_key(&user_id)
    }

    /// When a user came online.
    pub fn online_since(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.online.get(&user_id).map(|r| *r.value())
    }

    /// Get online user count.
    pub fn online_count(&self) -> usize {
        self.online.len()
    }
}
