//! Typing signal relay between conversation participants.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lovebirds_core::error::AppError;
use lovebirds_core::result::AppResult;
use lovebirds_core::traits::{MessageLog, UserDirectory};
use lovebirds_core::types::{ChannelId, ConversationId, UserId};

use crate::connection::handle::ConnectionHandle;
use crate::message::types::OutboundMessage;
use crate::metrics::RealtimeMetrics;
use crate::session::registry::SessionRegistry;

use super::typing::{TypingKey, TypingTracker, TypingTransition};

/// Number of delivery locks typing keys are striped across.
const DELIVERY_STRIPES: usize = 64;

/// Forwards typing transitions to the other participants' live channels.
///
/// The sender never receives its own signal. Incognito users are not
/// tracked at all, and pairs with a block in either direction see nothing.
///
/// Every transition of a key is applied and delivered under that key's
/// delivery lock, so recipients observe transitions in the order the
/// tracker applied them.
#[derive(Debug)]
pub struct TypingBroadcaster {
    tracker: TypingTracker,
    delivery: Vec<Mutex<()>>,
    registry: Arc<SessionRegistry>,
    log: Arc<dyn MessageLog>,
    directory: Arc<dyn UserDirectory>,
    metrics: Arc<RealtimeMetrics>,
}

impl TypingBroadcaster {
    /// Creates a broadcaster whose typing states expire after `timeout`.
    pub fn new(
        timeout: Duration,
        registry: Arc<SessionRegistry>,
        log: Arc<dyn MessageLog>,
        directory: Arc<dyn UserDirectory>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            tracker: TypingTracker::new(timeout),
            delivery: (0..DELIVERY_STRIPES).map(|_| Mutex::new(())).collect(),
            registry,
            log,
            directory,
            metrics,
        }
    }

    /// Applies a typing signal raised on `handle`.
    ///
    /// Fails with `Authorization` when the user is not a participant.
    pub async fn signal_typing(
        &self,
        handle: &ConnectionHandle,
        conversation_id: ConversationId,
        active: bool,
    ) -> AppResult<TypingTransition> {
        let participants = self.log.participants(conversation_id).await?;
        if !participants.contains(&handle.user_id) {
            return Err(AppError::authorization(format!(
                "Not a participant of conversation {conversation_id}"
            )));
        }

        if self.directory.is_incognito(handle.user_id).await? {
            return Ok(TypingTransition::Unchanged);
        }

        let key = (conversation_id, handle.user_id);
        let _ordered = self.delivery_lock(&key).lock().await;
        let transition = self.tracker.signal(key, handle.id, active, Instant::now());

        let forwarded = match transition {
            TypingTransition::Started | TypingTransition::Refreshed => true,
            TypingTransition::Stopped => false,
            TypingTransition::Unchanged => return Ok(transition),
        };
        self.forward(key, &participants, forwarded).await;

        Ok(transition)
    }

    /// Stops every typing state raised by a closed channel.
    pub async fn on_channel_closed(&self, channel_id: ChannelId) {
        let mut cleared = 0usize;
        for key in self.tracker.keys_for_channel(channel_id) {
            let _ordered = self.delivery_lock(&key).lock().await;
            if self.tracker.clear_if_raised_by(&key, channel_id) {
                self.announce_stopped(key).await;
                cleared += 1;
            }
        }
        if cleared > 0 {
            debug!(conn_id = %channel_id, count = cleared, "Cleared typing for closed channel");
        }
    }

    /// Stops the sender's typing state once their message is stored.
    pub async fn clear_for_message(&self, conversation_id: ConversationId, user_id: UserId) {
        let key = (conversation_id, user_id);
        let _ordered = self.delivery_lock(&key).lock().await;
        if self.tracker.clear(&key) {
            self.announce_stopped(key).await;
        }
    }

    /// Stops every typing state whose deadline is at or before `now`.
    pub async fn sweep(&self, now: Instant) -> usize {
        let mut count = 0;
        for key in self.tracker.stale_keys(now) {
            let _ordered = self.delivery_lock(&key).lock().await;
            if self.tracker.expire_if_stale(&key, now) {
                self.announce_stopped(key).await;
                count += 1;
            }
        }
        count
    }

    /// Periodically expires stale typing states until `shutdown` fires.
    pub async fn run_expiry_sweeper(self: Arc<Self>, every: Duration, shutdown: CancellationToken) {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let expired = self.sweep(Instant::now()).await;
                    if expired > 0 {
                        debug!(count = expired, "Expired typing states");
                    }
                }
            }
        }

        info!("Typing expiry sweeper stopped");
    }

    /// The underlying state machine.
    pub fn tracker(&self) -> &TypingTracker {
        &self.tracker
    }

    fn delivery_lock(&self, key: &TypingKey) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.delivery[(hasher.finish() as usize) % self.delivery.len()]
    }

    async fn announce_stopped(&self, key: TypingKey) {
        match self.log.participants(key.0).await {
            Ok(participants) => self.forward(key, &participants, false).await,
            Err(e) => {
                warn!(conversation_id = %key.0, error = %e, "Cannot resolve participants for typing stop");
            }
        }
    }

    async fn forward(&self, (conversation_id, typing_user_id): TypingKey, participants: &[UserId], active: bool) {
        let event = OutboundMessage::UserTyping {
            conversation_id,
            typing_user_id,
            active,
        };

        let mut sent = 0u64;
        for other in participants.iter().filter(|p| **p != typing_user_id) {
            match self.directory.is_blocked_between(typing_user_id, *other).await {
                Ok(false) => {}
                Ok(true) => continue,
                Err(e) => {
                    warn!(user_id = %other, error = %e, "Block lookup failed, skipping typing relay");
                    continue;
                }
            }

            for handle in self.registry.handles_for(other) {
                if handle.send(event.clone()) {
                    sent += 1;
                }
            }
        }

        self.metrics.events_sent(sent);
    }
}
