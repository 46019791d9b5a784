//! Individual channel handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;

use lovebirds_core::config::TransportKind;
use lovebirds_core::types::{ChannelId, UserId};

use crate::message::types::OutboundMessage;

/// A handle to a single live channel (one device connection).
///
/// Holds the sender for pushing events to the client plus metadata about
/// the authenticated user. Closing the handle cancels every task bound to
/// the channel.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique channel ID.
    pub id: ChannelId,
    /// User who owns this channel.
    pub user_id: UserId,
    /// Display name (cached from the credential).
    pub display_name: String,
    /// Transport carrying the channel.
    pub transport: TransportKind,
    /// When the channel was admitted.
    pub connected_at: DateTime<Utc>,
    /// When the credential used for the handshake expires.
    pub credential_expires_at: Option<DateTime<Utc>>,
    /// Sender for outbound events.
    sender: mpsc::Sender<OutboundMessage>,
    /// Last time the client was heard from (frame, pong or poll).
    last_seen: RwLock<DateTime<Utc>>,
    /// Whether the client already asked for a recent-chats snapshot.
    sync_requested: AtomicBool,
    /// Cancelled when the channel closes.
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new channel handle.
    pub fn new(
        user_id: UserId,
        display_name: String,
        transport: TransportKind,
        credential_expires_at: Option<DateTime<Utc>>,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ChannelId::new(),
            user_id,
            display_name,
            transport,
            connected_at: now,
            credential_expires_at,
            sender,
            last_seen: RwLock::new(now),
            sync_requested: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Queue an outbound event. Returns `false` if it was not queued.
    ///
    /// Events on one channel are delivered in queue order.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Channel send buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.close();
                false
            }
        }
    }

    /// Check if the channel is still open.
    pub fn is_alive(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Close the channel and cancel its in-flight work.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Token cancelled when the channel closes.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolves once the channel is closed.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    /// Record that the client was heard from.
    pub async fn touch(&self) {
        *self.last_seen.write().await = Utc::now();
    }

    /// Last time the client was heard from.
    pub async fn last_seen(&self) -> DateTime<Utc> {
        *self.last_seen.read().await
    }

    /// Record an explicit snapshot request. Returns whether it was the first.
    pub fn mark_sync_requested(&self) -> bool {
        !self.sync_requested.swap(true, Ordering::SeqCst)
    }

    /// Whether the client already asked for a snapshot.
    pub fn sync_requested(&self) -> bool {
        self.sync_requested.load(Ordering::SeqCst)
    }

    /// Whether the handshake credential has expired.
    pub fn credential_expired(&self, now: DateTime<Utc>) -> bool {
        self.credential_expires_at.is_some_and(|exp| exp <= now)
    }

    /// Get a snapshot of channel info.
    pub async fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            user_id: self.user_id,
            display_name: self.display_name.clone(),
            transport: self.transport,
            connected_at: self.connected_at,
            last_seen: self.last_seen().await,
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of channel info (serializable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Channel ID.
    pub id: ChannelId,
    /// User ID.
    pub user_id: UserId,
    /// Display name.
    pub display_name: String,
    /// Transport.
    pub transport: TransportKind,
    /// Connected at.
    pub connected_at: DateTime<Utc>,
    /// Last heard from.
    pub last_seen: DateTime<Utc>,
    /// Is alive.
    pub alive: bool,
}
