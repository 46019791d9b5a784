//! Typing state machine.
//!
//! One state per (conversation, user): **Idle → Typing** on the first
//! `active=true`, **Typing → Typing** on a refresh (deadline recomputed),
//! **Typing → Idle** on `active=false`, on the deadline passing, or when
//! the channel that raised it closes. Idle is represented by absence.
//!
//! All operations take `now` explicitly so the machine can be driven
//! without wall-clock waits.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use lovebirds_core::types::{ChannelId, ConversationId, UserId};

/// State key: (conversation, typing user).
pub type TypingKey = (ConversationId, UserId);

/// A live typing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingState {
    /// Channel whose signal opened or last refreshed the state.
    pub channel_id: ChannelId,
    /// Last `active=true` signal.
    pub last_signal_at: Instant,
    /// The state expires at this instant unless refreshed.
    pub deadline: Instant,
}

/// What a signal did to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingTransition {
    /// Idle → Typing.
    Started,
    /// Typing → Typing, deadline pushed back.
    Refreshed,
    /// Typing → Idle.
    Stopped,
    /// `active=false` while already idle.
    Unchanged,
}

/// All live typing states.
#[derive(Debug)]
pub struct TypingTracker {
    states: DashMap<TypingKey, TypingState>,
    timeout: Duration,
}

impl TypingTracker {
    /// Creates a tracker whose states expire after `timeout` without refresh.
    pub fn new(timeout: Duration) -> Self {
        Self {
            states: DashMap::new(),
            timeout,
        }
    }

    /// Applies a typing signal.
    pub fn signal(
        &self,
        key: TypingKey,
        channel_id: ChannelId,
        active: bool,
        now: Instant,
    ) -> TypingTransition {
        if !active {
            return match self.states.remove(&key) {
                Some(_) => TypingTransition::Stopped,
                None => TypingTransition::Unchanged,
            };
        }

        let state = TypingState {
            channel_id,
            last_signal_at: now,
            deadline: now + self.timeout,
        };
        match self.states.insert(key, state) {
            Some(_) => TypingTransition::Refreshed,
            None => TypingTransition::Started,
        }
    }

    /// Keys whose deadline is at or before `now`.
    pub fn stale_keys(&self, now: Instant) -> Vec<TypingKey> {
        self.states
            .iter()
            .filter(|entry| entry.deadline <= now)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Keys whose state was raised or last refreshed by `channel_id`.
    pub fn keys_for_channel(&self, channel_id: ChannelId) -> Vec<TypingKey> {
        self.states
            .iter()
            .filter(|entry| entry.channel_id == channel_id)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Forces `key` to Idle if its deadline is at or before `now`.
    pub fn expire_if_stale(&self, key: &TypingKey, now: Instant) -> bool {
        self.states
            .remove_if(key, |_, state| state.deadline <= now)
            .is_some()
    }

    /// Forces `key` to Idle if `channel_id` still owns it.
    pub fn clear_if_raised_by(&self, key: &TypingKey, channel_id: ChannelId) -> bool {
        self.states
            .remove_if(key, |_, state| state.channel_id == channel_id)
            .is_some()
    }

    /// Forces one state to Idle. Returns whether it was typing.
    pub fn clear(&self, key: &TypingKey) -> bool {
        self.states.remove(key).is_some()
    }

    /// Current state, if typing.
    pub fn state(&self, key: &TypingKey) -> Option<TypingState> {
        self.states.get(key).map(|s| *s)
    }

    /// Number of users currently typing anywhere.
    pub fn active_count(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn key() -> TypingKey {
        (ConversationId::new(), UserId::new())
    }

    #[test]
    fn test_idle_typing_idle_cycle() {
        let tracker = TypingTracker::new(TIMEOUT);
        let key = key();
        let channel = ChannelId::new();
        let t0 = Instant::now();

        assert_eq!(tracker.signal(key, channel, true, t0), TypingTransition::Started);
        assert_eq!(
            tracker.signal(key, channel, true, t0 + Duration::from_secs(1)),
            TypingTransition::Refreshed
        );
        assert_eq!(
            tracker.signal(key, channel, false, t0 + Duration::from_secs(2)),
            TypingTransition::Stopped
        );
        assert_eq!(
            tracker.signal(key, channel, false, t0 + Duration::from_secs(3)),
            TypingTransition::Unchanged
        );
    }

    #[test]
    fn test_refresh_recomputes_deadline() {
        let tracker = TypingTracker::new(TIMEOUT);
        let key = key();
        let channel = ChannelId::new();
        let t0 = Instant::now();

        tracker.signal(key, channel, true, t0);
        tracker.signal(key, channel, true, t0 + Duration::from_secs(4));

        assert!(tracker.stale_keys(t0 + Duration::from_secs(6)).is_empty());
        assert!(!tracker.expire_if_stale(&key, t0 + Duration::from_secs(6)));
        assert_eq!(tracker.stale_keys(t0 + Duration::from_secs(9)), vec![key]);
        assert!(tracker.expire_if_stale(&key, t0 + Duration::from_secs(9)));
        assert!(tracker.state(&key).is_none());
    }

    #[test]
    fn test_expire_only_stale_states() {
        let tracker = TypingTracker::new(TIMEOUT);
        let stale = key();
        let fresh = key();
        let t0 = Instant::now();

        tracker.signal(stale, ChannelId::new(), true, t0);
        tracker.signal(fresh, ChannelId::new(), true, t0 + Duration::from_secs(3));

        assert_eq!(tracker.stale_keys(t0 + TIMEOUT), vec![stale]);
        assert!(tracker.expire_if_stale(&stale, t0 + TIMEOUT));
        assert!(!tracker.expire_if_stale(&fresh, t0 + TIMEOUT));
        assert_eq!(tracker.active_count(), 1);
    }

    #[test]
    fn test_clear_channel_only_touches_its_states() {
        let tracker = TypingTracker::new(TIMEOUT);
        let phone = ChannelId::new();
        let laptop = ChannelId::new();
        let a = key();
        let b = key();
        let t0 = Instant::now();

        tracker.signal(a, phone, true, t0);
        tracker.signal(b, laptop, true, t0);

        assert_eq!(tracker.keys_for_channel(phone), vec![a]);
        assert!(!tracker.clear_if_raised_by(&b, phone));
        assert!(tracker.clear_if_raised_by(&a, phone));
        assert!(tracker.state(&b).is_some());
        assert!(tracker.keys_for_channel(phone).is_empty());
    }
}
