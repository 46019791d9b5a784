//! Recent-chats snapshot computation and delivery.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use lovebirds_core::error::{AppError, ErrorKind};
use lovebirds_core::result::AppResult;
use lovebirds_core::traits::MessageLog;
use lovebirds_core::types::{ConversationSummary, UserId};

use crate::connection::handle::ConnectionHandle;
use crate::message::types::OutboundMessage;
use crate::metrics::RealtimeMetrics;

/// Builds and pushes the ordered sidebar snapshot.
#[derive(Debug)]
pub struct RecentChatsSynchronizer {
    log: Arc<dyn MessageLog>,
    metrics: Arc<RealtimeMetrics>,
}

impl RecentChatsSynchronizer {
    /// Creates a synchronizer reading from `log`.
    pub fn new(log: Arc<dyn MessageLog>, metrics: Arc<RealtimeMetrics>) -> Self {
        Self { log, metrics }
    }

    /// One summary per conversation of `user_id`, most recent first.
    pub async fn load_recent_chats(&self, user_id: UserId) -> AppResult<Vec<ConversationSummary>> {
        let mut summaries = self
            .log
            .recent_summaries_for(user_id)
            .await
            .map_err(|e| match e.kind {
                ErrorKind::Synchronization => e,
                _ => AppError::synchronization(format!("Failed to load recent chats: {}", e.message)),
            })?;
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    /// Computes the snapshot and queues it on the channel.
    ///
    /// Abandoned if the channel closes while the query is pending. A failed
    /// query is reported as a non-fatal `error` event.
    pub async fn push_snapshot(&self, handle: &ConnectionHandle) {
        let result = tokio::select! {
            _ = handle.closed() => {
                debug!(conn_id = %handle.id, "Channel closed before snapshot was ready");
                return;
            }
            result = self.load_recent_chats(handle.user_id) => result,
        };

        match result {
            Ok(summaries) => {
                debug!(conn_id = %handle.id, count = summaries.len(), "Pushing recent chats");
                if handle.send(OutboundMessage::RecentChatsLoaded(summaries)) {
                    self.metrics.events_sent(1);
                }
            }
            Err(e) => {
                warn!(conn_id = %handle.id, user_id = %handle.user_id, error = %e, "Recent chats synchronization failed");
                handle.send(OutboundMessage::error(&e));
            }
        }
    }

    /// Pushes the initial snapshot once `debounce` has elapsed, unless the
    /// client asked for one first or the channel closed.
    pub fn schedule_initial_push(self: &Arc<Self>, handle: Arc<ConnectionHandle>, debounce: Duration) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = handle.closed() => return,
                _ = tokio::time::sleep(debounce) => {}
            }

            if !handle.mark_sync_requested() {
                return;
            }
            this.push_snapshot(&handle).await;
        });
    }
}

/// Orders summaries by `last_message_at` descending, ties by conversation
/// ID ascending.
pub fn sort_summaries(summaries: &mut [ConversationSummary]) {
    summaries.sort_by(|a, b| match b.last_message_at.cmp(&a.last_message_at) {
        Ordering::Equal => a.conversation_id.cmp(&b.conversation_id),
        other => other,
    });
}
